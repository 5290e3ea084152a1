//! StressChaos: CPU and memory pressure inside selected containers

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator, Walk, parse_byte_size};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStressor {
    #[serde(default)]
    pub workers: i32,

    /// Bytes per worker, or a percentage of total memory like `50%`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oom_score_adj: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CpuStressor {
    #[serde(default)]
    pub workers: i32,

    /// Load per worker in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stressors {
    #[serde(default, rename = "memory", skip_serializing_if = "Option::is_none")]
    pub memory_stressor: Option<MemoryStressor>,

    #[serde(default, rename = "cpu", skip_serializing_if = "Option::is_none")]
    pub cpu_stressor: Option<CpuStressor>,
}

fn check_workers(workers: i32, path: &FieldPath, v: &mut Validator<'_>) {
    if workers <= 0 {
        v.push(FieldError::invalid(
            path.child("workers"),
            workers,
            "workers should always be positive",
        ));
    }
}

/// Percentage `N%` with `0 <= N <= 100`, or a byte size
pub(crate) fn check_memory_size(size: &str) -> Result<(), String> {
    if size.is_empty() {
        return Ok(());
    }
    if let Some(percent) = size.strip_suffix('%') {
        let percent: i64 = percent.parse().map_err(|e| format!("{e}"))?;
        if !(0..=100).contains(&percent) {
            return Err("illegal proportion".to_string());
        }
        return Ok(());
    }
    parse_byte_size(size).map(|_| ())
}

impl Walk for Stressors {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        if let Some(memory) = &self.memory_stressor {
            let path = path.child("memory");
            check_workers(memory.workers, &path, v);
            if let Err(e) = check_memory_size(&memory.size) {
                v.push(FieldError::invalid(
                    path.child("size"),
                    memory.size.as_str(),
                    format!("incorrect bytes format: {e}"),
                ));
            }
        }
        if let Some(cpu) = &self.cpu_stressor {
            let path = path.child("cpu");
            check_workers(cpu.workers, &path, v);
            if let Some(load) = cpu.load
                && !(0..=100).contains(&load)
            {
                v.push(FieldError::invalid(path.child("load"), load, "illegal proportion"));
            }
        }
        if self.memory_stressor.is_none() && self.cpu_stressor.is_none() {
            v.push(FieldError::invalid(path.clone(), Value::Null, "missing stressors"));
        }
    }

    fn default_fields(&mut self, _: &crate::validation::Defaulter<'_>) {}
}

/// StressChaos runs stressors inside the selected containers
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "StressChaos",
    plural = "stresschaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StressChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stressors: Option<Stressors>,

    /// Raw stress-ng arguments
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stressng_stressors: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    StressChaosSpec {
        container_selector: "containerSelector" => inline,
        stressors: "stressors" => nested,
        duration: "duration" => leaf(Duration),
    }
    check = check_stress_chaos;
}

fn check_stress_chaos(spec: &StressChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    if spec.stressors.is_none() && spec.stressng_stressors.is_empty() {
        v.push(FieldError::invalid(path.clone(), Value::Null, "missing stressors"));
    }
}

impl Root for StressChaosSpec {}

impl ChaosSpec for StressChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
