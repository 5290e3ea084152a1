//! K8SChaos: apply arbitrary API objects for the duration of the experiment

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use crate::validation::{FieldError, FieldPath, Root, Validator};

/// Manifest applied on injection and deleted on recovery
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ApiObjects {
    /// YAML, possibly several `---` separated documents
    #[serde(default)]
    pub value: String,
}

crate::walk_fields! {
    ApiObjects {}
    check = check_api_objects;
}

fn check_api_objects(objects: &ApiObjects, path: &FieldPath, v: &mut Validator<'_>) {
    if objects.value.trim().is_empty() {
        v.push(FieldError::required(path.child("value"), "the value of apiObjects is required"));
        return;
    }
    for (i, document) in serde_yaml::Deserializer::from_str(&objects.value).enumerate() {
        if let Err(e) = serde_yaml::Value::deserialize(document) {
            v.push(FieldError::invalid(
                path.child("value"),
                objects.value.as_str(),
                format!("document {i} is not valid YAML: {e}"),
            ));
            break;
        }
    }
}

/// K8SChaos creates API objects and removes them when the experiment ends
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "K8SChaos",
    plural = "k8schaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct K8SChaosSpec {
    #[serde(default)]
    pub api_objects: ApiObjects,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

crate::walk_fields! {
    K8SChaosSpec {
        api_objects: "apiObjects" => nested,
        duration: "duration" => leaf(Duration),
    }
}

impl Root for K8SChaosSpec {}

impl ChaosSpec for K8SChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        Vec::new()
    }
}
