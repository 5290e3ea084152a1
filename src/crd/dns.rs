//! DNSChaos: wrong or failed DNS answers for selected containers

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum DnsChaosAction {
        /// Resolution fails
        Error => "error",
        /// Resolution returns a random address
        Random => "random",
    }
}

/// DNSChaos corrupts DNS resolution
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "DNSChaos",
    plural = "dnschaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DNSChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default)]
    pub action: DnsChaosAction,

    /// Affected domains; `*` matches any suffix when it is the last character
    #[serde(default, rename = "patterns", skip_serializing_if = "Vec::is_empty")]
    pub domain_name_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    DNSChaosSpec {
        container_selector: "containerSelector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_dns_chaos;
}

/// `*` may only be the final character
pub fn valid_pattern(pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(head) => !head.contains('*'),
        None => !pattern.is_empty() && !pattern.contains('*'),
    }
}

fn check_dns_chaos(spec: &DNSChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
    for (i, pattern) in spec.domain_name_patterns.iter().enumerate() {
        if !valid_pattern(pattern) {
            v.push(FieldError::invalid(
                path.child("patterns").index(i),
                pattern.as_str(),
                "the domain name pattern is invalid, * can only used in the end",
            ));
        }
    }
}

impl Root for DNSChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for DNSChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
