//! NetworkChaos: traffic control faults between pods

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::PodSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator, Walk};

string_enum! {
    pub enum Direction {
        To => "to",
        From => "from",
        Both => "both",
    }
}

string_enum! {
    pub enum NetworkChaosAction {
        Delay => "delay",
        Loss => "loss",
        Duplicate => "duplicate",
        Corrupt => "corrupt",
        Partition => "partition",
        Bandwidth => "bandwidth",
        Rate => "rate",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSpec {
    pub reorder: String,
    #[serde(default)]
    pub correlation: String,
    #[serde(default)]
    pub gap: i32,
}

crate::walk_fields! {
    ReorderSpec {
        reorder: "reorder" => leaf(FloatStr),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DelaySpec {
    #[serde(default)]
    pub latency: String,
    #[serde(default)]
    pub correlation: String,
    #[serde(default)]
    pub jitter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder: Option<ReorderSpec>,
}

crate::walk_fields! {
    DelaySpec {
        latency: "latency" => leaf(Duration),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
        jitter: "jitter" => leaf(Duration, default = "0ms"),
        reorder: "reorder" => nested,
    }
    check = check_latency;
}

fn check_latency(delay: &DelaySpec, path: &FieldPath, v: &mut Validator<'_>) {
    // Non-empty values are covered by the Duration tag.
    if delay.latency.is_empty() {
        v.push(FieldError::required(
            path.child("latency"),
            "latency is required on delay action",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LossSpec {
    pub loss: String,
    #[serde(default)]
    pub correlation: String,
}

crate::walk_fields! {
    LossSpec {
        loss: "loss" => leaf(FloatStr),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSpec {
    pub duplicate: String,
    #[serde(default)]
    pub correlation: String,
}

crate::walk_fields! {
    DuplicateSpec {
        duplicate: "duplicate" => leaf(FloatStr),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorruptSpec {
    pub corrupt: String,
    #[serde(default)]
    pub correlation: String,
}

crate::walk_fields! {
    CorruptSpec {
        corrupt: "corrupt" => leaf(FloatStr),
        correlation: "correlation" => leaf(FloatStr, default = "0"),
    }
}

/// Token bucket filter parameters
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthSpec {
    pub rate: String,
    /// Bytes that can be queued waiting for tokens
    pub limit: u32,
    /// Maximum bytes of tokens available instantaneously
    pub buffer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peakrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minburst: Option<u32>,
}

crate::walk_fields! {
    BandwidthSpec {
        rate: "rate" => leaf(RateUnit),
    }
    check = check_bandwidth;
}

fn check_bandwidth(bandwidth: &BandwidthSpec, path: &FieldPath, v: &mut Validator<'_>) {
    if bandwidth.limit == 0 {
        v.push(FieldError::invalid(
            path.child("limit"),
            bandwidth.limit,
            "limit must be greater than 0",
        ));
    }
    if bandwidth.buffer == 0 {
        v.push(FieldError::invalid(
            path.child("buffer"),
            bandwidth.buffer,
            "buffer must be greater than 0",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateSpec {
    pub rate: String,
}

crate::walk_fields! {
    RateSpec {
        rate: "rate" => leaf(RateUnit),
    }
}

/// NetworkChaos injects network faults into pods
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "NetworkChaos",
    plural = "networkchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkChaosSpec {
    #[serde(flatten)]
    pub pod_selector: PodSelector,

    #[serde(default)]
    pub action: NetworkChaosAction,

    /// Network interface of the source pods
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<LossSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<DuplicateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrupt: Option<CorruptSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<BandwidthSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PodSelector>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_device: String,

    /// IPs or domains outside the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_targets: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

impl Walk for NetworkChaosSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.pod_selector.validate_fields(path, v);
        v.extend(self.action.check(path.child("action")));
        v.leaf(
            &path.child("duration"),
            crate::validation::Tag::Duration,
            crate::validation::FieldAttrs::NONE,
            &self.duration,
        );
        self.delay.validate_fields(&path.child("delay"), v);
        self.loss.validate_fields(&path.child("loss"), v);
        self.duplicate.validate_fields(&path.child("duplicate"), v);
        self.corrupt.validate_fields(&path.child("corrupt"), v);
        self.bandwidth.validate_fields(&path.child("bandwidth"), v);
        self.rate.validate_fields(&path.child("rate"), v);
        if let Some(direction) = &self.direction {
            v.extend(direction.check(path.child("direction")));
        }
        self.target.validate_fields(&path.child("target"), v);
        self.check_action(path, v);
    }

    fn default_fields(&mut self, d: &crate::validation::Defaulter<'_>) {
        if self.direction.is_none() {
            self.direction = Some(Direction::To);
        }
        self.pod_selector.default_fields(d);
        self.delay.default_fields(d);
        self.loss.default_fields(d);
        self.duplicate.default_fields(d);
        self.corrupt.default_fields(d);
        self.bandwidth.default_fields(d);
        self.rate.default_fields(d);
        self.target.default_fields(d);
    }
}

impl NetworkChaosSpec {
    fn check_action(&self, path: &FieldPath, v: &mut Validator<'_>) {
        let required = |name: &str| {
            FieldError::required(
                path.child(name),
                format!("{name} is required on {} action", self.action),
            )
        };
        match self.action {
            NetworkChaosAction::Delay if self.delay.is_none() => v.push(required("delay")),
            NetworkChaosAction::Loss if self.loss.is_none() => v.push(required("loss")),
            NetworkChaosAction::Duplicate if self.duplicate.is_none() => {
                v.push(required("duplicate"))
            }
            NetworkChaosAction::Corrupt if self.corrupt.is_none() => v.push(required("corrupt")),
            NetworkChaosAction::Bandwidth if self.bandwidth.is_none() => {
                v.push(required("bandwidth"))
            }
            NetworkChaosAction::Rate if self.rate.is_none() => v.push(required("rate")),
            _ => {}
        }

        let reverse = matches!(self.direction, Some(Direction::From | Direction::Both));
        if !reverse {
            return;
        }
        let direction = self.direction.as_ref().map_or("", Direction::as_str);
        if self.action == NetworkChaosAction::Partition {
            if self.target.is_none() && self.external_targets.is_empty() {
                v.push(FieldError::invalid(
                    path.child("direction"),
                    direction,
                    "`from` and `both` direction cannot be used when targets and external targets are both empty",
                ));
            }
            return;
        }
        if !self.external_targets.is_empty() {
            v.push(FieldError::invalid(
                path.child("direction"),
                direction,
                "external targets cannot be used with `from` and `both` direction in netem action yet",
            ));
        }
        if self.target.is_none() {
            v.push(FieldError::invalid(
                path.child("direction"),
                direction,
                "`from` and `both` direction cannot be used when targets is empty in netem action",
            ));
        }
    }
}

impl Root for NetworkChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for NetworkChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        let mut selectors = vec![(".", SelectorRef::Pod(&self.pod_selector))];
        if let Some(target) = &self.target {
            selectors.push((".target", SelectorRef::Pod(target)));
        }
        selectors
    }
}
