//! KernelChaos: fail kernel allocations and bio requests through BPF

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::PodSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator};

/// One frame of the call chain that must match
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub funcname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameters: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub predicate: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailKernRequest {
    /// 0: kmalloc, 1: alloc_page, 2: bio
    #[serde(rename = "failtype")]
    pub fail_type: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callchain: Vec<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u32>,
    /// Maximum number of failures, unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
}

crate::walk_fields! {
    FailKernRequest {
        probability: "probability" => leaf(Percent, nilable),
    }
    check = check_fail_type;
}

fn check_fail_type(request: &FailKernRequest, path: &FieldPath, v: &mut Validator<'_>) {
    if !(0..=2).contains(&request.fail_type) {
        v.push(FieldError::invalid(
            path.child("failtype"),
            request.fail_type,
            "failtype should be in 0-2",
        ));
    }
}

/// KernelChaos makes kernel requests of the selected pods fail
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "KernelChaos",
    plural = "kernelchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KernelChaosSpec {
    #[serde(flatten)]
    pub pod_selector: PodSelector,

    #[serde(default)]
    pub fail_kern_request: FailKernRequest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    KernelChaosSpec {
        pod_selector: "podSelector" => inline,
        fail_kern_request: "failKernRequest" => nested,
        duration: "duration" => leaf(Duration),
    }
}

impl Root for KernelChaosSpec {}

impl ChaosSpec for KernelChaosSpec {
    const SPEC_IMMUTABLE: bool = true;

    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Pod(&self.pod_selector))]
    }
}
