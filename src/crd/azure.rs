//! AzureChaos: stop or restart virtual machines and detach data disks

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, CloudTarget, SelectorRef};
use crate::validation::{FieldPath, Root, Validator};

string_enum! {
    pub enum AzureChaosAction {
        VmStop => "vm-stop",
        VmRestart => "vm-restart",
        DiskDetach => "disk-detach",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureSelector {
    #[serde(default, rename = "subscriptionID")]
    pub subscription_id: String,

    #[serde(default)]
    pub resource_group_name: String,

    #[serde(default)]
    pub vm_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,

    /// Logical unit number of the data disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,
}

crate::walk_fields! {
    AzureSelector {
        disk_name: "diskName" => leaf(DiskName),
        lun: "lun" => leaf(Lun),
    }
}

impl CloudTarget for AzureSelector {
    fn identity(&self) -> BTreeMap<&'static str, String> {
        let mut identity = BTreeMap::from([
            ("subscriptionID", self.subscription_id.clone()),
            ("resourceGroupName", self.resource_group_name.clone()),
            ("vmName", self.vm_name.clone()),
        ]);
        if let Some(disk) = &self.disk_name {
            identity.insert("diskName", disk.clone());
        }
        if let Some(lun) = self.lun {
            identity.insert("lun", lun.to_string());
        }
        identity
    }
}

/// AzureChaos injects faults into Azure virtual machines
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "AzureChaos",
    plural = "azurechaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureChaosSpec {
    #[serde(default)]
    pub action: AzureChaosAction,

    #[serde(flatten)]
    pub selector: AzureSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    AzureChaosSpec {
        selector: "selector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_azure_chaos;
}

fn check_azure_chaos(spec: &AzureChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
}

impl Root for AzureChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for AzureChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        self.action == AzureChaosAction::VmRestart
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Cloud(&self.selector))]
    }
}
