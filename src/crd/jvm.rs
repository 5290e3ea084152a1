//! JVMChaos: bytecode-level faults in Java applications

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{Defaulter, FieldError, FieldPath, Root, Validator};

/// Port of the in-process agent unless set
pub const DEFAULT_JVM_PORT: i32 = 9277;

string_enum! {
    pub enum JvmChaosAction {
        Latency => "latency",
        Return => "return",
        Exception => "exception",
        Stress => "stress",
        Gc => "gc",
        RuleData => "ruleData",
        Mysql => "mysql",
    }
}

/// JVMChaos injects faults into JVM applications through an agent
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "JVMChaos",
    plural = "jvmchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JVMChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default)]
    pub action: JvmChaosAction,

    #[serde(default)]
    pub port: i32,

    /// Java process id, the first one found by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,

    /// Milliseconds added to each call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<i32>,

    /// Value returned instead of the real one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    /// Exception thrown, e.g. `java.io.IOException("BOOM")`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exception: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<i32>,

    #[serde(default, rename = "memType", skip_serializing_if = "String::is_empty")]
    pub memory_type: String,

    /// Byteman rule
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_data: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mysql_connector_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sql_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    JVMChaosSpec {
        container_selector: "containerSelector" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_jvm_chaos;
    defaults = default_port;
}

fn default_port(spec: &mut JVMChaosSpec, _: &Defaulter<'_>) {
    if spec.port == 0 {
        spec.port = DEFAULT_JVM_PORT;
    }
}

fn require(v: &mut Validator<'_>, path: &FieldPath, field: &str, present: bool, action: &JvmChaosAction) {
    if !present {
        v.push(FieldError::required(
            path.child(field),
            format!("{field} is required on {action} action"),
        ));
    }
}

fn check_jvm_chaos(spec: &JVMChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    let action = &spec.action;
    v.extend(action.check(path.child("action")));

    let class_method = |v: &mut Validator<'_>| {
        require(v, path, "class", !spec.class.is_empty(), action);
        require(v, path, "method", !spec.method.is_empty(), action);
    };
    let latency = spec.latency.unwrap_or_default();
    let cpu_count = spec.cpu_count.unwrap_or_default();

    match action {
        JvmChaosAction::Latency => {
            if latency <= 0 {
                v.push(FieldError::invalid(
                    path.child("latency"),
                    latency,
                    "latency should be greater than 0 on latency action",
                ));
            }
            class_method(v);
        }
        JvmChaosAction::Return => {
            require(v, path, "value", !spec.value.is_empty(), action);
            class_method(v);
        }
        JvmChaosAction::Exception => {
            require(v, path, "exception", !spec.exception.is_empty(), action);
            class_method(v);
        }
        JvmChaosAction::RuleData => {
            require(v, path, "ruleData", !spec.rule_data.is_empty(), action);
        }
        JvmChaosAction::Stress => match (cpu_count > 0, spec.memory_type.is_empty()) {
            (false, true) => v.push(FieldError::invalid(
                path.clone(),
                Value::Null,
                "must set one of cpuCount and memType on stress action",
            )),
            (true, false) => v.push(FieldError::invalid(
                path.clone(),
                Value::Null,
                "inject stress on both CPU and memory is not supported",
            )),
            (false, false) if !matches!(spec.memory_type.as_str(), "stack" | "heap") => {
                v.push(FieldError::not_supported(
                    path.child("memType"),
                    spec.memory_type.as_str(),
                    &["stack", "heap"],
                ));
            }
            _ => {}
        },
        JvmChaosAction::Mysql => {
            if !matches!(spec.mysql_connector_version.as_str(), "5" | "8") {
                v.push(FieldError::not_supported(
                    path.child("mysqlConnectorVersion"),
                    spec.mysql_connector_version.as_str(),
                    &["5", "8"],
                ));
            }
            if spec.exception.is_empty() && latency <= 0 {
                v.push(FieldError::invalid(
                    path.clone(),
                    Value::Null,
                    "must set one of exception and latency on mysql action",
                ));
            }
        }
        JvmChaosAction::Gc | JvmChaosAction::Other(_) => {}
    }

    if spec.port <= 0 || spec.port > 65535 {
        v.push(FieldError::invalid(
            path.child("port"),
            spec.port,
            format!("port {} is not in range 1-65535", spec.port),
        ));
    }
}

impl Root for JVMChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for JVMChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
