//! BlockChaos: throttle or delay a block device behind a volume

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerNodeVolumePathSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum BlockChaosAction {
        Limit => "limit",
        Delay => "delay",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockDelaySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jitter: String,
}

crate::walk_fields! {
    BlockDelaySpec {
        latency: "latency" => leaf(Duration),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
        jitter: "jitter" => leaf(Duration, default = "0ms"),
    }
}

/// BlockChaos injects faults into the block device backing a volume
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "BlockChaos",
    plural = "blockchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BlockChaosSpec {
    #[serde(flatten)]
    pub volume_selector: ContainerNodeVolumePathSelector,

    #[serde(default)]
    pub action: BlockChaosAction,

    /// IO operations per second allowed on limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<BlockDelaySpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    BlockChaosSpec {
        volume_selector: "volumeSelector" => inline,
        action: "action" => leaf(DiskAction),
        delay: "delay" => nested,
        duration: "duration" => leaf(Duration),
    }
    check = check_block_chaos;
}

fn check_block_chaos(spec: &BlockChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    match spec.action {
        BlockChaosAction::Limit => {
            let iops = spec.iops.unwrap_or_default();
            if iops <= 0 {
                v.push(FieldError::invalid(
                    path.child("iops"),
                    iops,
                    "iops should be greater than 0 on limit action",
                ));
            }
        }
        BlockChaosAction::Delay => {
            let latency = spec.delay.as_ref().and_then(|d| d.latency.as_deref());
            if latency.is_none_or(str::is_empty) {
                v.push(FieldError::required(
                    path.child("delay").child("latency"),
                    "latency is required on delay action",
                ));
            }
        }
        BlockChaosAction::Other(_) => {}
    }
}

impl Root for BlockChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for BlockChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::ContainerVolume(&self.volume_selector))]
    }
}
