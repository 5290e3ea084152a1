//! GCPChaos: stop or reset compute instances and lose attached disks

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, CloudTarget, SelectorRef};
use crate::validation::{FieldPath, Root, Validator};

string_enum! {
    pub enum GcpChaosAction {
        NodeStop => "node-stop",
        NodeReset => "node-reset",
        DiskLoss => "disk-loss",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GcpSelector {
    #[serde(default)]
    pub project: String,

    #[serde(default)]
    pub zone: String,

    #[serde(default)]
    pub instance: String,

    /// Disks lost on disk-loss
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_names: Option<Vec<String>>,
}

crate::walk_fields! {
    GcpSelector {
        device_names: "deviceNames" => leaf(GcpDeviceNames),
    }
}

impl CloudTarget for GcpSelector {
    fn identity(&self) -> BTreeMap<&'static str, String> {
        let mut identity = BTreeMap::from([
            ("project", self.project.clone()),
            ("zone", self.zone.clone()),
            ("instance", self.instance.clone()),
        ]);
        if let Some(devices) = &self.device_names {
            identity.insert("deviceNames", devices.join(","));
        }
        identity
    }
}

/// GCPChaos injects faults into GCP compute instances
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "GCPChaos",
    plural = "gcpchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GCPChaosSpec {
    #[serde(default)]
    pub action: GcpChaosAction,

    /// Secret holding the service account key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(flatten)]
    pub selector: GcpSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    GCPChaosSpec {
        selector: "selector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_gcp_chaos;
}

fn check_gcp_chaos(spec: &GCPChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
}

impl Root for GCPChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for GCPChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        self.action == GcpChaosAction::NodeReset
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Cloud(&self.selector))]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::crd::common::admit_spec;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> GCPChaosSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_disk_loss_needs_devices() {
        let mut chaos = spec(json!({"action": "disk-loss", "project": "p", "zone": "z", "instance": "i"}));
        assert!(admit_spec(&mut chaos, "default").has_path("spec.deviceNames"));

        chaos.selector.device_names = Some(vec![]);
        assert!(admit_spec(&mut chaos, "default").has_path("spec.deviceNames"));

        chaos.selector.device_names = Some(vec!["disk-1".into()]);
        assert!(admit_spec(&mut chaos, "default").is_empty());
    }

    #[test]
    fn test_node_reset_is_one_shot() {
        let mut chaos = spec(json!({"action": "node-reset", "project": "p", "zone": "z", "instance": "i"}));
        assert!(admit_spec(&mut chaos, "default").is_empty());
        assert!(chaos.is_one_shot());
    }
}
