//! CloudStackVMChaos: stop or restart CloudStack virtual machines

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ChaosSpec, ChaosStatus, CloudTarget, SelectorRef};
use crate::validation::{FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum CloudStackVmAction {
        VmStop => "vm-stop",
        VmRestart => "vm-restart",
    }
}

/// Where and how to reach the CloudStack API
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackApiConfig {
    #[serde(default)]
    pub address: String,

    #[serde(default, rename = "verifySSL")]
    pub verify_ssl: bool,

    /// Secret holding the API key and secret
    #[serde(default)]
    pub secret_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key_field: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_secret_field: String,
}

crate::walk_fields! {
    CloudStackApiConfig {}
    check = check_api_config;
    defaults = default_api_config;
}

fn default_api_config(config: &mut CloudStackApiConfig, _: &crate::validation::Defaulter<'_>) {
    if config.api_key_field.is_empty() {
        config.api_key_field = "api-key".to_string();
    }
    if config.api_secret_field.is_empty() {
        config.api_secret_field = "api-secret".to_string();
    }
}

fn check_api_config(config: &CloudStackApiConfig, path: &FieldPath, v: &mut Validator<'_>) {
    if config.address.is_empty() {
        v.push(FieldError::required(path.child("address"), "the API address is required"));
    }
    if config.secret_name.is_empty() {
        v.push(FieldError::required(
            path.child("secretName"),
            "the secret holding API credentials is required",
        ));
    }
}

/// Filters of the `listVirtualMachines` call; at least one must be set
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackVmSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_group_id: Option<String>,
    #[serde(default)]
    pub display_vm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(default, rename = "isoid", skip_serializing_if = "Option::is_none")]
    pub iso_id: Option<String>,
    #[serde(default)]
    pub is_recursive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default)]
    pub list_all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_offering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl CloudStackVmSelector {
    /// Set filters by JSON name; boolean flags alone do not narrow the list
    fn filters(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("account", &self.account),
            ("affinityGroupId", &self.affinity_group_id),
            ("domainId", &self.domain_id),
            ("groupId", &self.group_id),
            ("hostId", &self.host_id),
            ("hypervisor", &self.hypervisor),
            ("id", &self.id),
            ("isoid", &self.iso_id),
            ("keyPair", &self.key_pair),
            ("keyword", &self.keyword),
            ("name", &self.name),
            ("networkId", &self.network_id),
            ("projectId", &self.project_id),
            ("serviceOffering", &self.service_offering),
            ("state", &self.state),
            ("storageId", &self.storage_id),
            ("templateId", &self.template_id),
            ("userId", &self.user_id),
            ("vpcId", &self.vpc_id),
            ("zoneId", &self.zone_id),
        ];
        let mut filters: Vec<(&'static str, String)> = optional
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect();
        if !self.ids.is_empty() {
            filters.push(("ids", self.ids.join(",")));
        }
        for (key, value) in &self.tags {
            filters.push(("tags", format!("{key}={value}")));
        }
        filters
    }
}

crate::walk_fields! {
    CloudStackVmSelector {}
    check = check_vm_selector;
}

fn check_vm_selector(selector: &CloudStackVmSelector, path: &FieldPath, v: &mut Validator<'_>) {
    if selector.filters().is_empty() {
        v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "at least one of the selector fields must be specified",
        ));
    }
}

impl CloudTarget for CloudStackVmSelector {
    fn identity(&self) -> BTreeMap<&'static str, String> {
        let mut identity = BTreeMap::new();
        for (key, value) in self.filters() {
            identity
                .entry(key)
                .and_modify(|existing: &mut String| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.clone());
        }
        identity
    }
}

/// CloudStackVMChaos injects faults into CloudStack virtual machines
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "CloudStackVMChaos",
    plural = "cloudstackvmchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackVMChaosSpec {
    #[serde(default)]
    pub api_config: CloudStackApiConfig,

    #[serde(default)]
    pub selector: CloudStackVmSelector,

    /// Only log what would be done
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub action: CloudStackVmAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    CloudStackVMChaosSpec {
        api_config: "apiConfig" => nested,
        selector: "selector" => nested,
        duration: "duration" => leaf(Duration),
    }
    check = check_cloudstack_chaos;
}

fn check_cloudstack_chaos(spec: &CloudStackVMChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
}

impl Root for CloudStackVMChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for CloudStackVMChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        self.action == CloudStackVmAction::VmRestart
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".selector", SelectorRef::Cloud(&self.selector))]
    }
}
