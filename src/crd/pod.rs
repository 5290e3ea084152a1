//! PodChaos: kill pods or containers, or make pods fail

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum PodChaosAction {
        PodKill => "pod-kill",
        PodFailure => "pod-failure",
        ContainerKill => "container-kill",
    }
}

/// PodChaos injects faults into pods
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "PodChaos",
    plural = "podchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default)]
    pub action: PodChaosAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Seconds to wait before the pod is deleted forcibly
    #[serde(default)]
    pub grace_period: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    PodChaosSpec {
        container_selector: "containerSelector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_pod_chaos;
}

fn check_pod_chaos(spec: &PodChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
    if spec.action == PodChaosAction::ContainerKill
        && spec.container_selector.container_names.is_empty()
    {
        v.push(FieldError::required(
            path.child("containerNames"),
            "the name of container is required on container-kill action",
        ));
    }
    if spec.grace_period < 0 {
        v.push(FieldError::invalid(
            path.child("gracePeriod"),
            spec.grace_period,
            "gracePeriod should be greater than or equal to 0",
        ));
    }
}

impl Root for PodChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for PodChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        matches!(
            self.action,
            PodChaosAction::PodKill | PodChaosAction::ContainerKill
        )
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
