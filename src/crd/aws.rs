//! AWSChaos: stop or restart EC2 instances and detach EBS volumes

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, CloudTarget, SelectorRef};
use crate::validation::{FieldPath, Root, Validator};

string_enum! {
    pub enum AwsChaosAction {
        Ec2Stop => "ec2-stop",
        Ec2Restart => "ec2-restart",
        DetachVolume => "detach-volume",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsSelector {
    /// Custom API endpoint, e.g. for localstack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub aws_region: String,

    #[serde(default)]
    pub ec2_instance: String,

    /// Volume detached on detach-volume
    #[serde(default, alias = "volumeID", skip_serializing_if = "Option::is_none")]
    pub ebs_volume: Option<String>,

    /// Device name of the volume on the instance, e.g. `/dev/sdf`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

crate::walk_fields! {
    AwsSelector {
        ebs_volume: "ebsVolume" => leaf(EbsVolume),
        device_name: "deviceName" => leaf(AwsDeviceName),
    }
}

impl CloudTarget for AwsSelector {
    fn identity(&self) -> BTreeMap<&'static str, String> {
        let mut identity = BTreeMap::from([
            ("awsRegion", self.aws_region.clone()),
            ("ec2Instance", self.ec2_instance.clone()),
        ]);
        let optional = [
            ("endpoint", &self.endpoint),
            ("ebsVolume", &self.ebs_volume),
            ("deviceName", &self.device_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                identity.insert(key, value.clone());
            }
        }
        identity
    }
}

/// AWSChaos injects faults into AWS resources
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "AWSChaos",
    plural = "awschaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AWSChaosSpec {
    #[serde(default)]
    pub action: AwsChaosAction,

    /// Secret holding the AWS credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(flatten)]
    pub selector: AwsSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    AWSChaosSpec {
        selector: "selector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_aws_chaos;
}

fn check_aws_chaos(spec: &AWSChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
}

impl Root for AWSChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for AWSChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn is_one_shot(&self) -> bool {
        self.action == AwsChaosAction::Ec2Restart
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Cloud(&self.selector))]
    }
}
