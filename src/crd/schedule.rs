//! Schedule: spawn a chaos experiment or workflow on a cron schedule

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::embed::{ChaosKind, EmbedChaos};
use super::workflow::WorkflowSpec;
use crate::validation::{Defaulter, FieldError, FieldPath, Root, Validator, parse_cron};

const DEFAULT_HISTORY_LIMIT: i32 = 5;
const WORKFLOW_TYPE: &str = "Workflow";

/// What a schedule spawns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleType {
    Chaos(ChaosKind),
    Workflow,
    /// Unrecognized value, kept verbatim
    Other(String),
}

string_schema!(ScheduleType);

impl ScheduleType {
    pub fn as_str(&self) -> &str {
        match self {
            ScheduleType::Chaos(kind) => kind.as_str(),
            ScheduleType::Workflow => WORKFLOW_TYPE,
            ScheduleType::Other(value) => value,
        }
    }

    /// Every recognized value
    pub fn supported() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = ChaosKind::ALL.iter().map(|k| k.as_str()).collect();
        names.push(WORKFLOW_TYPE);
        names
    }
}

impl Default for ScheduleType {
    fn default() -> Self {
        ScheduleType::Other(String::new())
    }
}

impl From<String> for ScheduleType {
    fn from(value: String) -> Self {
        if value == WORKFLOW_TYPE {
            return ScheduleType::Workflow;
        }
        match ChaosKind::from_name(&value) {
            Some(kind) => ScheduleType::Chaos(kind),
            None => ScheduleType::Other(value),
        }
    }
}

impl From<&str> for ScheduleType {
    fn from(value: &str) -> Self {
        ScheduleType::from(value.to_string())
    }
}

impl From<ScheduleType> for String {
    fn from(value: ScheduleType) -> Self {
        match value {
            ScheduleType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

string_enum! {
    pub enum ConcurrencyPolicy {
        /// Skip a run while the previous one is still active
        Forbid => "Forbid",
        Allow => "Allow",
    }
}

/// Cron-driven spawner of a single chaos kind or workflow
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "Schedule",
    plural = "schedules",
    namespaced,
    status = "ScheduleStatus",
    printcolumn = r#"{"name":"Schedule", "type":"string", "jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    #[serde(default)]
    pub schedule: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_deadline_seconds: Option<i64>,

    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,

    #[serde(default)]
    pub history_limit: i32,

    #[serde(default, rename = "type")]
    pub type_: ScheduleType,

    #[serde(flatten)]
    pub embed: EmbedChaos,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Box<WorkflowSpec>>,
}

crate::walk_fields! {
    ScheduleSpec {
        embed: "" => inline,
        workflow: "workflow" => nested,
    }
    check = check_schedule;
    defaults = default_schedule;
}

impl Root for ScheduleSpec {}

impl ScheduleSpec {
    /// Next activation strictly after `after`
    pub fn next_activation(&self, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, String> {
        Ok(parse_cron(&self.schedule)?.next_after(after))
    }
}

fn default_schedule(spec: &mut ScheduleSpec, _: &Defaulter<'_>) {
    default_common(&mut spec.concurrency_policy, &mut spec.history_limit);
}

fn check_schedule(spec: &ScheduleSpec, path: &FieldPath, v: &mut Validator<'_>) {
    check_common(
        ScheduleFields {
            schedule: &spec.schedule,
            starting_deadline_seconds: spec.starting_deadline_seconds,
            concurrency_policy: &spec.concurrency_policy,
            history_limit: spec.history_limit,
        },
        path,
        v,
    );
    match &spec.type_ {
        ScheduleType::Chaos(kind) => require_embedded(&spec.embed, *kind, path, v),
        ScheduleType::Workflow if spec.workflow.is_none() => v.push(FieldError::invalid(
            path.child("workflow"),
            Value::Null,
            "the value of workflow is required",
        )),
        ScheduleType::Workflow => {}
        ScheduleType::Other(other) => v.push(unsupported_type(path, other, &ScheduleType::supported())),
    }
}

/// Schedule nested in a workflow template; spawns chaos only
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChaosOnlyScheduleSpec {
    #[serde(default)]
    pub schedule: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_deadline_seconds: Option<i64>,

    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,

    #[serde(default)]
    pub history_limit: i32,

    #[serde(default, rename = "type")]
    pub type_: ScheduleType,

    #[serde(flatten)]
    pub embed: EmbedChaos,
}

crate::walk_fields! {
    ChaosOnlyScheduleSpec {
        embed: "" => inline,
    }
    check = check_chaos_only_schedule;
    defaults = default_chaos_only_schedule;
}

impl Root for ChaosOnlyScheduleSpec {}

fn default_chaos_only_schedule(spec: &mut ChaosOnlyScheduleSpec, _: &Defaulter<'_>) {
    default_common(&mut spec.concurrency_policy, &mut spec.history_limit);
}

fn check_chaos_only_schedule(spec: &ChaosOnlyScheduleSpec, path: &FieldPath, v: &mut Validator<'_>) {
    check_common(
        ScheduleFields {
            schedule: &spec.schedule,
            starting_deadline_seconds: spec.starting_deadline_seconds,
            concurrency_policy: &spec.concurrency_policy,
            history_limit: spec.history_limit,
        },
        path,
        v,
    );
    match &spec.type_ {
        ScheduleType::Chaos(kind) => require_embedded(&spec.embed, *kind, path, v),
        other => {
            let supported: Vec<&str> = ChaosKind::ALL.iter().map(|k| k.as_str()).collect();
            v.push(unsupported_type(path, other.as_str(), &supported));
        }
    }
}

struct ScheduleFields<'a> {
    schedule: &'a str,
    starting_deadline_seconds: Option<i64>,
    concurrency_policy: &'a ConcurrencyPolicy,
    history_limit: i32,
}

fn default_common(policy: &mut ConcurrencyPolicy, history_limit: &mut i32) {
    if policy.as_str().is_empty() {
        *policy = ConcurrencyPolicy::Forbid;
    }
    if *history_limit == 0 {
        *history_limit = DEFAULT_HISTORY_LIMIT;
    }
}

fn check_common(fields: ScheduleFields<'_>, path: &FieldPath, v: &mut Validator<'_>) {
    if let Err(e) = parse_cron(fields.schedule) {
        v.push(FieldError::invalid(
            path.child("schedule"),
            fields.schedule,
            format!("parse cron field error:{e}"),
        ));
    }
    if let Some(deadline) = fields.starting_deadline_seconds
        && deadline < 0
    {
        v.push(FieldError::invalid(
            path.child("startingDeadlineSeconds"),
            deadline,
            "startingDeadlineSeconds should not be negative",
        ));
    }
    v.extend(fields.concurrency_policy.check(path.child("concurrencyPolicy")));
    if fields.history_limit < 1 {
        v.push(FieldError::invalid(
            path.child("historyLimit"),
            fields.history_limit,
            "historyLimit should be at least 1",
        ));
    }
}

pub(crate) fn require_embedded(embed: &EmbedChaos, kind: ChaosKind, path: &FieldPath, v: &mut Validator<'_>) {
    if !embed.contains(kind) {
        v.push(FieldError::invalid(
            path.child(kind.json_key()),
            Value::Null,
            format!("the value of chaos {kind} is required"),
        ));
    }
}

fn unsupported_type(path: &FieldPath, value: &str, supported: &[&str]) -> FieldError {
    if value.is_empty() {
        FieldError::required(path.child("type"), "type is required")
    } else {
        FieldError::not_supported(path.child("type"), value, supported)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schedule_time: Option<Time>,

    /// Objects spawned and still running
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active: Vec<ObjectReference>,
}
