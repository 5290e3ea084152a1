//! TimeChaos: skew the clocks seen by selected containers

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{Defaulter, FieldError, FieldPath, Root, Validator};

/// Clock ids accepted in `clockIds`
pub const CLOCK_IDS: &[&str] = &[
    "CLOCK_REALTIME",
    "CLOCK_MONOTONIC",
    "CLOCK_PROCESS_CPUTIME_ID",
    "CLOCK_THREAD_CPUTIME_ID",
    "CLOCK_MONOTONIC_RAW",
    "CLOCK_REALTIME_COARSE",
    "CLOCK_MONOTONIC_COARSE",
    "CLOCK_BOOTTIME",
    "CLOCK_REALTIME_ALARM",
    "CLOCK_BOOTTIME_ALARM",
];

/// TimeChaos shifts the time of the selected containers
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "TimeChaos",
    plural = "timechaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Offset", "type":"string", "jsonPath":".spec.timeOffset"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TimeChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    /// Offset added to the clocks, e.g. `-5m`
    #[serde(default)]
    pub time_offset: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clock_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    TimeChaosSpec {
        container_selector: "containerSelector" => inline,
        time_offset: "timeOffset" => leaf(Duration),
        duration: "duration" => leaf(Duration),
    }
    check = check_time_chaos;
    defaults = default_clock_ids;
}

fn default_clock_ids(spec: &mut TimeChaosSpec, _: &Defaulter<'_>) {
    if spec.clock_ids.is_empty() {
        spec.clock_ids = vec!["CLOCK_REALTIME".to_string()];
    }
}

fn check_time_chaos(spec: &TimeChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    if spec.time_offset.is_empty() {
        v.push(FieldError::required(
            path.child("timeOffset"),
            "time offset is required",
        ));
    }
    for (i, clock) in spec.clock_ids.iter().enumerate() {
        if !CLOCK_IDS.contains(&clock.as_str()) {
            v.push(FieldError::not_supported(
                path.child("clockIds").index(i),
                clock.as_str(),
                CLOCK_IDS,
            ));
        }
    }
}

impl Root for TimeChaosSpec {}

impl ChaosSpec for TimeChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
