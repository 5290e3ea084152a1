//! Target selectors shared by the chaos kinds
//!
//! Every pod-based selector carries a `mode` and an optional `value`; the
//! pair is checked once here and reused by every kind that embeds a
//! selector.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validation::{Defaulter, ErrorList, FieldError, FieldPath, Validator, Walk};

/// Detail of a `value` that is not an integer
pub const VALUE_PARSE_ERROR: &str = "parse value field error";

string_enum! {
    /// How many of the selected targets are affected
    pub enum SelectorMode {
        One => "one",
        All => "all",
        Fixed => "fixed",
        FixedPercent => "fixed-percent",
        RandomMaxPercent => "random-max-percent",
    }
}

/// Check that `value` agrees with `mode`. Errors land on `path.mode` or
/// `path.value`.
pub fn check_mode_value(mode: &SelectorMode, value: &str, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    let value_path = path.child("value");
    match mode {
        SelectorMode::One | SelectorMode::All => {}
        SelectorMode::Fixed => match value.parse::<i64>() {
            Err(e) => errors.push(FieldError::invalid(
                value_path,
                value,
                format!("{VALUE_PARSE_ERROR}:{e}"),
            )),
            Ok(n) if n <= 0 => errors.push(FieldError::invalid(
                value_path,
                value,
                format!("value must be greater than 0 with mode:{mode}"),
            )),
            Ok(_) => {}
        },
        SelectorMode::FixedPercent | SelectorMode::RandomMaxPercent => {
            match value.parse::<i64>() {
                Err(e) => errors.push(FieldError::invalid(
                    value_path,
                    value,
                    format!("{VALUE_PARSE_ERROR}:{e}"),
                )),
                Ok(p) if p <= 0 || p > 100 => errors.push(FieldError::invalid(
                    value_path,
                    value,
                    format!("value of {p} is invalid, Must be (0,100] with mode:{mode}"),
                )),
                Ok(_) => {}
            }
        }
        SelectorMode::Other(m) if m.is_empty() => {
            errors.push(FieldError::required(path.child("mode"), "mode is required"));
        }
        SelectorMode::Other(_) => errors.extend(mode.check(path.child("mode"))),
    }
    errors
}

/// Filters narrowing down the candidate pods
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodSelectorSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,

    /// Explicit pods by namespace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pods: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selectors: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_selectors: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_selectors: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expression_selectors: Vec<LabelSelectorRequirement>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotation_selectors: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_phase_selectors: Vec<String>,
}

impl PodSelectorSpec {
    /// Target the object's own namespace when none is given
    pub fn default_namespace(&mut self, namespace: &str) {
        if self.namespaces.is_empty() {
            self.namespaces = vec![namespace.to_string()];
        }
    }

    /// Targets any namespace
    pub fn cluster_scoped(&self) -> bool {
        self.namespaces.is_empty() && self.pods.is_empty()
    }

    /// Namespaces named by `namespaces` or `pods`, sorted and deduplicated
    pub fn affected_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .pods
            .keys()
            .chain(self.namespaces.iter())
            .cloned()
            .collect();
        namespaces.sort();
        namespaces.dedup();
        namespaces
    }

    pub fn is_empty(&self) -> bool {
        self == &PodSelectorSpec::default()
    }
}

/// Pod selector with its sampling mode
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodSelector {
    #[serde(default)]
    pub selector: PodSelectorSpec,

    #[serde(default)]
    pub mode: SelectorMode,

    /// Count or percentage, depending on `mode`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Walk for PodSelector {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        v.extend(check_mode_value(&self.mode, &self.value, path));
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        if let Some(namespace) = d.namespace() {
            self.selector.default_namespace(namespace);
        }
    }
}

/// Pod selector narrowed to named containers
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSelector {
    #[serde(flatten)]
    pub pod_selector: PodSelector,

    /// Empty means every container of the pod
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_names: Vec<String>,
}

crate::walk_fields! {
    ContainerSelector {
        pod_selector: "podSelector" => inline,
    }
}

/// Container selector plus the volume backing the block device
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNodeVolumePathSelector {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default)]
    pub volume_name: String,
}

crate::walk_fields! {
    ContainerNodeVolumePathSelector {
        container_selector: "containerSelector" => inline,
    }
    check = check_volume_name;
}

fn check_volume_name(s: &ContainerNodeVolumePathSelector, path: &FieldPath, v: &mut Validator<'_>) {
    if s.volume_name.is_empty() {
        v.push(FieldError::required(
            path.child("volumeName"),
            "the name of volume is required",
        ));
    }
}

/// Physical machines, either listed by address or selected like pods
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalMachineSelector {
    /// Addresses of chaosd servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,

    /// Selects PhysicalMachine objects
    #[serde(default, skip_serializing_if = "PodSelectorSpec::is_empty")]
    pub selector: PodSelectorSpec,

    #[serde(default)]
    pub mode: SelectorMode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Walk for PhysicalMachineSelector {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        match (self.address.is_empty(), self.selector.is_empty()) {
            (true, true) => v.push(FieldError::invalid(
                path.child("address"),
                serde_json::Value::Null,
                "one of address or selector should be specified",
            )),
            (false, false) => v.push(FieldError::invalid(
                path.child("address"),
                self.address.clone(),
                "only one of address or selector could be specified",
            )),
            (false, true) => {
                for (i, address) in self.address.iter().enumerate() {
                    if let Err(e) = url::Url::parse(address) {
                        v.push(FieldError::invalid(
                            path.child("address").index(i),
                            address.as_str(),
                            format!("invalid address: {e}"),
                        ));
                    }
                }
            }
            (true, false) => v.extend(check_mode_value(&self.mode, &self.value, path)),
        }
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        for address in &mut self.address {
            if !address.starts_with("http://") && !address.starts_with("https://") {
                *address = format!("http://{address}");
            }
        }
        // Only a selector given in the object gets the namespace
        if !self.selector.is_empty()
            && let Some(namespace) = d.namespace()
        {
            self.selector.default_namespace(namespace);
        }
    }
}
