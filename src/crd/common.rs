use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::selector::{
    ContainerNodeVolumePathSelector, ContainerSelector, PhysicalMachineSelector, PodSelector,
};
use crate::validation::{DurationError, Root, Walk, parse_duration};

/// API group of every chaos resource
pub const GROUP: &str = "chaos-mesh.org";
/// API version of every chaos resource
pub const VERSION: &str = "v1alpha1";

/// Annotation that pauses an experiment when set to `"true"`
pub const PAUSE_ANNOTATION: &str = "experiment.chaos-mesh.org/pause";

/// Warning returned when an object is admitted in paused state
pub const PAUSED_WARNING: &str = "experiment is created in paused state";

/// True when the pause annotation is set to `"true"`
pub fn is_paused(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(PAUSE_ANNOTATION))
        .is_some_and(|v| v == "true")
}

string_enum! {
    /// Condition types reported on a chaos resource
    pub enum ConditionType {
        Selected => "Selected",
        AllInjected => "AllInjected",
        AllRecovered => "AllRecovered",
        Paused => "Paused",
    }
}

string_enum! {
    pub enum ConditionStatus {
        True => "True",
        False => "False",
        Unknown => "Unknown",
    }
}

string_enum! {
    /// Phase the controller drives the experiment towards
    pub enum DesiredPhase {
        Run => "Run",
        Stop => "Stop",
    }
}

string_enum! {
    /// Injection phase of one target
    pub enum Phase {
        NotInjected => "Not Injected",
        Injected => "Injected",
    }
}

string_enum! {
    pub enum RecordEventType {
        Succeeded => "Succeeded",
        Failed => "Failed",
    }
}

string_enum! {
    pub enum RecordEventOperation {
        Apply => "Apply",
        Recover => "Recover",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChaosCondition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// Result of one apply or recover attempt on a target
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordEvent {
    #[serde(rename = "type")]
    pub type_: RecordEventType,
    pub operation: RecordEventOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Time>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Per-target injection record
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub selector_key: String,
    pub phase: Phase,
    #[serde(default)]
    pub injected_count: i32,
    #[serde(default)]
    pub recovered_count: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<RecordEvent>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_phase: Option<DesiredPhase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_records: Vec<Record>,
}

/// Status shared by every chaos kind
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChaosStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ChaosCondition>,
    #[serde(default)]
    pub experiment: ExperimentStatus,
}

impl ChaosStatus {
    pub fn condition(&self, type_: &ConditionType) -> Option<&ChaosCondition> {
        self.conditions.iter().find(|c| &c.type_ == type_)
    }

    /// Every record is injected (and there is at least one)
    pub fn all_injected(&self) -> bool {
        let records = &self.experiment.container_records;
        !records.is_empty() && records.iter().all(|r| r.phase == Phase::Injected)
    }

    /// No record is still injected
    pub fn all_recovered(&self) -> bool {
        self.experiment
            .container_records
            .iter()
            .all(|r| r.phase == Phase::NotInjected)
    }
}

/// Borrowed view of one selector inside a chaos spec
#[derive(Debug, Clone, Copy)]
pub enum SelectorRef<'a> {
    Pod(&'a PodSelector),
    Container(&'a ContainerSelector),
    ContainerVolume(&'a ContainerNodeVolumePathSelector),
    PhysicalMachine(&'a PhysicalMachineSelector),
    /// Cloud resource identified by provider fields
    Cloud(&'a dyn CloudTarget),
}

/// Provider-specific identity of a cloud resource
pub trait CloudTarget: std::fmt::Debug + Sync {
    /// Identity fields by JSON name, unset ones omitted
    fn identity(&self) -> BTreeMap<&'static str, String>;
}

/// Progress of an experiment against its `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationProgress {
    /// No duration: runs until stopped
    Unbounded,
    /// Still running, with time left
    Running(TimeDelta),
    /// `creationTimestamp + duration` is in the past
    Exceeded,
}

/// Evaluate `created + duration` against `now`
pub fn duration_progress(
    created: Option<DateTime<Utc>>,
    duration: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DurationProgress, DurationError> {
    let Some(duration) = duration.filter(|d| !d.is_empty()) else {
        return Ok(DurationProgress::Unbounded);
    };
    let duration = parse_duration(duration)?;
    let created = created.unwrap_or(now);
    match created.checked_add_signed(duration) {
        Some(stop) if stop < now => Ok(DurationProgress::Exceeded),
        Some(stop) => Ok(DurationProgress::Running(stop - now)),
        None => Ok(DurationProgress::Running(TimeDelta::MAX)),
    }
}

/// Behaviour every chaos spec provides to the kind registry
pub trait ChaosSpec: Walk + Root + PartialEq + Serialize {
    /// Whether updates may change the spec
    const SPEC_IMMUTABLE: bool = false;

    fn duration(&self) -> Option<&str>;

    /// The selected action has no recovery step
    fn is_one_shot(&self) -> bool {
        false
    }

    /// Selectors keyed by JSON path relative to the spec
    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)>;
}

/// Object-safe view of a chaos resource
pub trait ChaosObject: std::fmt::Debug + Send + Sync {
    fn kind(&self) -> &'static str;
    fn meta(&self) -> &ObjectMeta;
    fn duration(&self) -> Option<&str>;
    fn is_one_shot(&self) -> bool;
    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)>;
    fn status(&self) -> Option<&ChaosStatus>;

    fn is_paused(&self) -> bool {
        is_paused(self.meta())
    }

    fn duration_exceeded(&self, now: DateTime<Utc>) -> Result<DurationProgress, DurationError> {
        let created = self.meta().creation_timestamp.as_ref().map(|t| t.0);
        duration_progress(created, self.duration(), now)
    }
}

/// Default then validate a spec rooted at `spec`, with a fresh registry
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn admit_spec<S: Walk + Root>(spec: &mut S, namespace: &str) -> crate::validation::ErrorList {
    use crate::validation::{FieldPath, Registry, default_tree, validate_tree};

    let registry = Registry::with_builtins().expect("builtin registry");
    default_tree(&registry, Some(namespace), spec);
    validate_tree(&registry, &*spec, &FieldPath::new("spec"), &*spec)
}
