//! Workflow: a graph of templates composing chaos, tasks and checks
//!
//! Only the static shape of the graph is checked at admission: every
//! reference resolves, names are unique DNS-1123 subdomains, and each
//! template carries exactly the fields its type allows.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use k8s_openapi::api::core::v1::{Container, Volume};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::ConditionStatus;
use super::embed::{ChaosKind, EmbedChaos};
use super::schedule::{ChaosOnlyScheduleSpec, require_embedded};
use super::status_check::StatusCheckSpec;
use crate::validation::{ErrorList, FieldError, FieldPath, Root, Validator};

const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const DNS1123_SUBDOMAIN_FMT: &str = r"[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*";

static DNS1123_SUBDOMAIN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(&format!("^{DNS1123_SUBDOMAIN_FMT}$")));

/// Reasons `value` is not a lowercase RFC 1123 subdomain; empty when it is
pub fn dns1123_subdomain_errors(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(format!("must be no more than {DNS1123_SUBDOMAIN_MAX_LENGTH} characters"));
    }
    let matches = match DNS1123_SUBDOMAIN.as_ref() {
        Ok(pattern) => pattern.is_match(value),
        Err(e) => {
            errors.push(e.to_string());
            return errors;
        }
    };
    if !matches {
        errors.push(format!(
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character (e.g. 'example.com', regex used for \
             validation is '{DNS1123_SUBDOMAIN_FMT}')"
        ));
    }
    errors
}

const TASK: &str = "Task";
const SERIAL: &str = "Serial";
const PARALLEL: &str = "Parallel";
const SUSPEND: &str = "Suspend";
const SCHEDULE: &str = "Schedule";
const STATUS_CHECK: &str = "StatusCheck";

/// Type of a workflow node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemplateType {
    /// Run a container and branch on its output
    Task,
    /// Run children one after another
    Serial,
    /// Run children at the same time
    Parallel,
    /// Wait until the deadline
    Suspend,
    Schedule,
    StatusCheck,
    Chaos(ChaosKind),
    /// Unrecognized value, kept verbatim
    Other(String),
}

string_schema!(TemplateType);

impl TemplateType {
    pub fn as_str(&self) -> &str {
        match self {
            TemplateType::Task => TASK,
            TemplateType::Serial => SERIAL,
            TemplateType::Parallel => PARALLEL,
            TemplateType::Suspend => SUSPEND,
            TemplateType::Schedule => SCHEDULE,
            TemplateType::StatusCheck => STATUS_CHECK,
            TemplateType::Chaos(kind) => kind.as_str(),
            TemplateType::Other(value) => value,
        }
    }
}

impl Default for TemplateType {
    fn default() -> Self {
        TemplateType::Other(String::new())
    }
}

impl From<String> for TemplateType {
    fn from(value: String) -> Self {
        match value.as_str() {
            TASK => TemplateType::Task,
            SERIAL => TemplateType::Serial,
            PARALLEL => TemplateType::Parallel,
            SUSPEND => TemplateType::Suspend,
            SCHEDULE => TemplateType::Schedule,
            STATUS_CHECK => TemplateType::StatusCheck,
            name => match ChaosKind::from_name(name) {
                Some(kind) => TemplateType::Chaos(kind),
                None => TemplateType::Other(value),
            },
        }
    }
}

impl From<&str> for TemplateType {
    fn from(value: &str) -> Self {
        TemplateType::from(value.to_string())
    }
}

impl From<TemplateType> for String {
    fn from(value: TemplateType) -> Self {
        match value {
            TemplateType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// Branch taken after a task when `expression` holds
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalBranch {
    pub target: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expression: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "templateType")]
    pub template_type: TemplateType,

    /// Maximum run time of the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,

    /// Template names, for Serial and Parallel
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_branches: Vec<ConditionalBranch>,

    #[serde(flatten)]
    pub embed: EmbedChaos,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Box<ChaosOnlyScheduleSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_check: Option<Box<StatusCheckSpec>>,

    /// Abort the workflow when the status check fails
    #[serde(default)]
    pub abort_with_status_check: bool,
}

crate::walk_fields! {
    Template {
        deadline: "deadline" => leaf(Duration),
        embed: "" => inline,
        schedule: "schedule" => nested,
        status_check: "statusCheck" => nested,
    }
    check = check_template;
}

/// Fields a template may carry besides its name and deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Task,
    Children,
    ConditionalBranches,
    Chaos,
    Schedule,
    StatusCheck,
}

impl Part {
    fn present(self, template: &Template) -> bool {
        match self {
            Part::Task => template.task.is_some(),
            Part::Children => !template.children.is_empty(),
            Part::ConditionalBranches => !template.conditional_branches.is_empty(),
            Part::Chaos => !template.embed.is_empty(),
            Part::Schedule => template.schedule.is_some(),
            Part::StatusCheck => template.status_check.is_some(),
        }
    }

    fn forbidden(self, template: &Template, path: &FieldPath) -> FieldError {
        let (name, value) = match self {
            Part::Task => ("Task", serde_json::to_value(&template.task)),
            Part::Children => ("Children", serde_json::to_value(&template.children)),
            Part::ConditionalBranches => (
                "ConditionalBranches",
                serde_json::to_value(&template.conditional_branches),
            ),
            Part::Chaos => ("any Chaos", serde_json::to_value(&template.embed)),
            Part::Schedule => ("Schedule", serde_json::to_value(&template.schedule)),
            Part::StatusCheck => ("StatusCheck", serde_json::to_value(&template.status_check)),
        };
        FieldError::invalid(
            path.clone(),
            value.unwrap_or(Value::Null),
            format!("this template should not contain {name}"),
        )
    }
}

fn forbid(template: &Template, parts: &[Part], path: &FieldPath, v: &mut Validator<'_>) {
    for part in parts {
        if part.present(template) {
            v.push(part.forbidden(template, path));
        }
    }
}

fn check_template(template: &Template, path: &FieldPath, v: &mut Validator<'_>) {
    let name_path = path.child("name");
    if template.name.is_empty() {
        v.push(FieldError::required(name_path.clone(), "name of template is required"));
    }
    let dns_errors = dns1123_subdomain_errors(&template.name);
    if !dns_errors.is_empty() {
        v.push(FieldError::invalid(
            name_path,
            template.name.as_str(),
            format!("field name must be DNS-1123 subdomain, [{}]", dns_errors.join(" ")),
        ));
    }

    use Part::*;
    match &template.template_type {
        TemplateType::Suspend => {
            if template.deadline.as_deref().is_none_or(str::is_empty) {
                v.push(FieldError::invalid(
                    path.child("deadline"),
                    Value::Null,
                    "deadline in template with type Suspend could not be empty",
                ));
            }
            forbid(template, &[Task, Children, ConditionalBranches, Chaos, Schedule, StatusCheck], path, v);
        }
        TemplateType::Serial | TemplateType::Parallel => {
            forbid(template, &[Task, ConditionalBranches, Chaos, Schedule, StatusCheck], path, v);
        }
        TemplateType::Schedule => {
            if template.schedule.is_none() {
                v.push(FieldError::invalid(
                    path.child("schedule"),
                    Value::Null,
                    "the value of schedule is required",
                ));
            }
            forbid(template, &[Task, Children, ConditionalBranches, Chaos, StatusCheck], path, v);
        }
        TemplateType::Task => {
            match &template.task {
                None => v.push(FieldError::required(path.child("task"), "the value of task is required")),
                Some(task) if task.container.is_none() => v.push(FieldError::required(
                    path.child("task").child("container"),
                    "container of task is required",
                )),
                Some(_) => {}
            }
            forbid(template, &[Children, Chaos, Schedule, StatusCheck], path, v);
        }
        TemplateType::Chaos(kind) => {
            check_chaos_template(template, *kind, path, v);
            forbid(template, &[Task, Children, ConditionalBranches, Schedule, StatusCheck], path, v);
        }
        TemplateType::StatusCheck => {
            if template.status_check.is_none() {
                v.push(FieldError::invalid(
                    path.child("statusCheck"),
                    Value::Null,
                    "the value of statusCheck is required",
                ));
            }
            forbid(template, &[Task, Children, ConditionalBranches, Chaos, Schedule], path, v);
        }
        TemplateType::Other(other) => v.push(FieldError::invalid(
            path.child("templateType"),
            other.as_str(),
            format!("unrecognized template type: {other}"),
        )),
    }
}

/// The embedded spec must exist and leave timing to the template deadline
fn check_chaos_template(template: &Template, kind: ChaosKind, path: &FieldPath, v: &mut Validator<'_>) {
    match template.embed.duration(kind) {
        None => require_embedded(&template.embed, kind, path, v),
        Some(Some(duration)) if !duration.is_empty() => v.push(FieldError::invalid(
            path.clone(),
            duration,
            "should not define duration in chaos when using Workflow, use Template#Deadline instead.",
        )),
        Some(_) => {}
    }
}

/// Workflow graph
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "Workflow",
    plural = "workflows",
    namespaced,
    status = "WorkflowStatus",
    printcolumn = r#"{"name":"Entry", "type":"string", "jsonPath":".spec.entry"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    /// Name of the first template to run
    #[serde(default)]
    pub entry: String,

    #[serde(default)]
    pub templates: Vec<Template>,
}

crate::walk_fields! {
    WorkflowSpec {
        templates: "templates" => nested,
    }
    check = check_workflow;
}

impl Root for WorkflowSpec {}

impl WorkflowSpec {
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }
}

fn check_workflow(spec: &WorkflowSpec, path: &FieldPath, v: &mut Validator<'_>) {
    let names: BTreeSet<&str> = spec.templates.iter().map(|t| t.name.as_str()).collect();

    let entry_path = path.child("entry");
    if spec.entry.is_empty() {
        v.push(FieldError::required(entry_path.clone(), "the entry of workflow is required"));
    }
    if !names.contains(spec.entry.as_str()) {
        v.push(missing_template(entry_path, &spec.entry));
    }

    let templates_path = path.child("templates");
    if spec.templates.is_empty() {
        v.push(FieldError::invalid(
            templates_path,
            Value::Array(Vec::new()),
            "templates in workflow could not be empty",
        ));
        return;
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for template in &spec.templates {
        *counts.entry(template.name.as_str()).or_default() += 1;
    }
    let duplicated: Vec<&str> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    if !duplicated.is_empty() {
        v.push(FieldError::invalid(
            templates_path.clone(),
            "",
            format!(
                "template name must be unique, duplicated names: [{}]",
                duplicated.join(" ")
            ),
        ));
    }

    for (i, template) in spec.templates.iter().enumerate() {
        let template_path = templates_path.index(i);
        if matches!(template.template_type, TemplateType::Serial | TemplateType::Parallel) {
            let children_path = template_path.child("children");
            for (j, child) in template.children.iter().enumerate() {
                if !names.contains(child.as_str()) {
                    v.push(missing_template(children_path.index(j), child));
                }
            }
        }
        let branches_path = template_path.child("conditionalBranches");
        for (j, branch) in template.conditional_branches.iter().enumerate() {
            if !names.contains(branch.target.as_str()) {
                v.push(missing_template(branches_path.index(j).child("target"), &branch.target));
            }
        }
    }
}

fn missing_template(path: FieldPath, name: &str) -> FieldError {
    FieldError::invalid(path, name, format!("can not find a template with name {name}"))
}

string_enum! {
    pub enum WorkflowConditionType {
        Accomplished => "Accomplished",
        Scheduled => "Scheduled",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCondition {
    #[serde(rename = "type")]
    pub type_: WorkflowConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// Runtime state written by the workflow engine
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<WorkflowCondition>,
}

impl Workflow {
    /// Errors for status fields set by a client; they belong to the engine
    pub fn reserved_status_errors(&self) -> ErrorList {
        let mut errors = ErrorList::new();
        let Some(status) = &self.status else {
            return errors;
        };
        let path = FieldPath::new("status");
        let mut reserved = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                errors.push(FieldError::invalid(
                    path.child(name),
                    value,
                    "field is reserved for the workflow engine",
                ));
            }
        };
        reserved("entryNode", status.entry_node.clone().map(Value::from));
        reserved("startTime", status.start_time.as_ref().map(|t| Value::from(t.0.to_rfc3339())));
        reserved("endTime", status.end_time.as_ref().map(|t| Value::from(t.0.to_rfc3339())));
        if !status.conditions.is_empty() {
            reserved("conditions", serde_json::to_value(&status.conditions).ok());
        }
        errors
    }

    pub fn is_accomplished(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.conditions.iter().any(|c| {
                c.type_ == WorkflowConditionType::Accomplished && c.status == ConditionStatus::True
            })
        })
    }
}
