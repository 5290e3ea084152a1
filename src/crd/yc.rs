//! YCChaos: stop or restart Yandex Cloud compute instances

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, CloudTarget, SelectorRef};
use crate::validation::{FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum YcChaosAction {
        ComputeStop => "compute-stop",
        ComputeRestart => "compute-restart",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct YcSelector {
    #[serde(default)]
    pub folder_id: String,

    #[serde(default)]
    pub compute_instance: String,
}

impl CloudTarget for YcSelector {
    fn identity(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("folderId", self.folder_id.clone()),
            ("computeInstance", self.compute_instance.clone()),
        ])
    }
}

/// YCChaos injects faults into Yandex Cloud instances
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "YCChaos",
    plural = "ycchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct YCChaosSpec {
    #[serde(default)]
    pub action: YcChaosAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(flatten)]
    pub selector: YcSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    YCChaosSpec {
        duration: "duration" => leaf(Duration),
    }
    check = check_yc_chaos;
}

fn check_yc_chaos(spec: &YCChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
    if spec.selector.folder_id.is_empty() {
        v.push(FieldError::required(path.child("folderId"), "the folder ID is required"));
    }
    if spec.selector.compute_instance.is_empty() {
        v.push(FieldError::required(
            path.child("computeInstance"),
            "the compute instance ID is required",
        ));
    }
}

impl Root for YCChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for YCChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        self.action == YcChaosAction::ComputeRestart
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Cloud(&self.selector))]
    }
}
