//! StatusCheck: periodic probes gating a workflow

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::common::{ConditionStatus, DurationProgress, duration_progress};
use crate::validation::{
    Defaulter, DurationError, ErrorList, FieldError, FieldPath, NoAction, Registry, Root,
    Validator, default_tree, validate_tree,
};

/// Label carrying the template type
pub const TEMPLATE_TYPE_LABEL: &str = "template.chaos-mesh.org/type";
/// Annotation carrying the template's display name
pub const TEMPLATE_NAME_ANNOTATION: &str = "template.chaos-mesh.org/name";
/// Annotation carrying the template's description
pub const TEMPLATE_DESCRIPTION_ANNOTATION: &str = "template.chaos-mesh.org/description";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "chaos-mesh";
/// Value of [`TEMPLATE_TYPE_LABEL`] for status check templates
pub const STATUS_CHECK_TEMPLATE_TYPE: &str = "statuscheck";
/// Key of the template body in the config map
pub const TEMPLATE_SPEC_KEY: &str = "spec";

const DEFAULT_TIMEOUT_SECONDS: i32 = 1;
const DEFAULT_INTERVAL_SECONDS: i32 = 10;
const DEFAULT_FAILURE_THRESHOLD: i32 = 3;
const DEFAULT_SUCCESS_THRESHOLD: i32 = 1;
const DEFAULT_RECORDS_HISTORY_LIMIT: i32 = 100;
const MAX_RECORDS_HISTORY_LIMIT: i32 = 1000;

string_enum! {
    pub enum StatusCheckMode {
        /// Finish once a threshold is reached
        Synchronous => "Synchronous",
        /// Keep probing until the duration elapses
        Continuous => "Continuous",
    }
}

string_enum! {
    pub enum StatusCheckType {
        Http => "HTTP",
    }
}

string_enum! {
    pub enum HttpRequestMethod {
        Get => "GET",
        Post => "POST",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpCriteria {
    /// A code such as `200`, or a range such as `200-399`
    #[serde(default)]
    pub status_code: String,
}

crate::walk_fields! {
    HttpCriteria {
        status_code: "statusCode" => leaf(StatusCode),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpStatusCheck {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub method: HttpRequestMethod,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    #[serde(default)]
    pub criteria: HttpCriteria,
}

crate::walk_fields! {
    HttpStatusCheck {
        criteria: "criteria" => nested,
    }
    check = check_http_status_check;
    defaults = default_http_status_check;
}

fn default_http_status_check(check: &mut HttpStatusCheck, _: &Defaulter<'_>) {
    if check.method.as_str().is_empty() {
        check.method = HttpRequestMethod::Get;
    }
}

fn check_http_status_check(check: &HttpStatusCheck, path: &FieldPath, v: &mut Validator<'_>) {
    if check.url.is_empty() {
        v.push(FieldError::required(path.child("url"), "request url is required"));
    } else if url::Url::parse(&check.url).is_err() {
        v.push(FieldError::invalid(
            path.child("url"),
            check.url.as_str(),
            "invalid http request url",
        ));
    }
    if !check.method.is_known() {
        v.push(FieldError::invalid(
            path.child("method"),
            check.method.as_str(),
            "request method should be GET or POST",
        ));
    }
}

/// A probe and the thresholds that decide its outcome
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "StatusCheck",
    plural = "statuschecks",
    namespaced,
    status = "StatusCheckStatus",
    printcolumn = r#"{"name":"Mode", "type":"string", "jsonPath":".spec.mode"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckSpec {
    #[serde(default)]
    pub mode: StatusCheckMode,

    #[serde(default, rename = "type")]
    pub type_: StatusCheckType,

    /// Required in Continuous mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default)]
    pub timeout_seconds: i32,

    #[serde(default)]
    pub interval_seconds: i32,

    #[serde(default)]
    pub failure_threshold: i32,

    #[serde(default)]
    pub success_threshold: i32,

    #[serde(default)]
    pub records_history_limit: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpStatusCheck>,
}

crate::walk_fields! {
    StatusCheckSpec {
        duration: "duration" => leaf(Duration),
        http: "http" => nested,
    }
    check = check_status_check;
    defaults = default_status_check;
}

fn default_status_check(spec: &mut StatusCheckSpec, _: &Defaulter<'_>) {
    if spec.mode.as_str().is_empty() {
        spec.mode = StatusCheckMode::Synchronous;
    }
    for (field, default) in [
        (&mut spec.timeout_seconds, DEFAULT_TIMEOUT_SECONDS),
        (&mut spec.interval_seconds, DEFAULT_INTERVAL_SECONDS),
        (&mut spec.failure_threshold, DEFAULT_FAILURE_THRESHOLD),
        (&mut spec.success_threshold, DEFAULT_SUCCESS_THRESHOLD),
        (&mut spec.records_history_limit, DEFAULT_RECORDS_HISTORY_LIMIT),
    ] {
        if *field == 0 {
            *field = default;
        }
    }
}

fn check_status_check(spec: &StatusCheckSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.mode.check(path.child("mode")));
    match &spec.type_ {
        StatusCheckType::Http if spec.http.is_none() => v.push(FieldError::invalid(
            path.child("http"),
            Value::Null,
            "the detail of http status check is required",
        )),
        StatusCheckType::Http => {}
        StatusCheckType::Other(other) => v.push(FieldError::invalid(
            path.child("type"),
            other.as_str(),
            format!("unrecognized type: {other}"),
        )),
    }
    if spec.mode == StatusCheckMode::Continuous && spec.duration.as_deref().is_none_or(str::is_empty) {
        v.push(FieldError::invalid(
            path.child("duration"),
            Value::Null,
            "duration should be specified when mode is Continuous",
        ));
    }
    for (name, value) in [
        ("timeoutSeconds", spec.timeout_seconds),
        ("intervalSeconds", spec.interval_seconds),
        ("failureThreshold", spec.failure_threshold),
        ("successThreshold", spec.success_threshold),
        ("recordsHistoryLimit", spec.records_history_limit),
    ] {
        if value < 1 {
            v.push(FieldError::invalid(
                path.child(name),
                value,
                format!("{name} should not be less than 1"),
            ));
        }
    }
    if spec.records_history_limit > MAX_RECORDS_HISTORY_LIMIT {
        v.push(FieldError::invalid(
            path.child("recordsHistoryLimit"),
            spec.records_history_limit,
            format!("recordsHistoryLimit should not be greater than {MAX_RECORDS_HISTORY_LIMIT}"),
        ));
    }
}

impl Root for StatusCheckSpec {}

string_enum! {
    pub enum StatusCheckConditionType {
        Completed => "Completed",
        DurationExceed => "DurationExceed",
        FailureThresholdExceed => "FailureThresholdExceed",
        SuccessThresholdExceed => "SuccessThresholdExceed",
    }
}

string_enum! {
    pub enum StatusCheckOutcome {
        Success => "Success",
        Failure => "Failure",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckCondition {
    #[serde(rename = "type")]
    pub type_: StatusCheckConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    pub outcome: StatusCheckOutcome,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,
    #[serde(default)]
    pub count: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCheckCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<StatusCheckRecord>,
}

impl StatusCheck {
    /// Progress against `duration`, measured from the first probe
    pub fn duration_exceeded(&self, now: DateTime<Utc>) -> Result<DurationProgress, DurationError> {
        let started = self
            .status
            .as_ref()
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0);
        if started.is_none() {
            return Ok(DurationProgress::Unbounded);
        }
        duration_progress(started, self.spec.duration.as_deref(), now)
    }

    pub fn is_completed(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.conditions.iter().any(|c| {
                c.type_ == StatusCheckConditionType::Completed && c.status == ConditionStatus::True
            })
        })
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("invalid status check template: {0}")]
    Invalid(ErrorList),

    #[error("failed to encode status check template: {0}")]
    Encode(#[from] serde_yaml::Error),
}

/// Build the config map storing a reusable status check template.
///
/// The spec is defaulted and validated first; the stored body is the
/// defaulted spec as YAML.
pub fn status_check_template(
    registry: &Registry,
    namespace: &str,
    name: &str,
    description: &str,
    mut spec: StatusCheckSpec,
) -> Result<ConfigMap, TemplateError> {
    default_tree(registry, Some(namespace), &mut spec);
    let errors = validate_tree(registry, &NoAction, &FieldPath::new("spec"), &spec);
    if !errors.is_empty() {
        return Err(TemplateError::Invalid(errors));
    }

    let labels = BTreeMap::from([
        (TEMPLATE_TYPE_LABEL.to_string(), STATUS_CHECK_TEMPLATE_TYPE.to_string()),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
    ]);
    let annotations = BTreeMap::from([
        (TEMPLATE_NAME_ANNOTATION.to_string(), name.to_string()),
        (TEMPLATE_DESCRIPTION_ANNOTATION.to_string(), description.to_string()),
    ]);

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(status_check_template_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            TEMPLATE_SPEC_KEY.to_string(),
            serde_yaml::to_string(&spec)?,
        )])),
        ..Default::default()
    })
}

/// Name of the config map holding template `name`
pub fn status_check_template_name(name: &str) -> String {
    format!("chaos-mesh-statuscheck-{name}")
}
