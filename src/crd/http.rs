//! HTTPChaos: abort, delay or rewrite HTTP traffic of selected pods

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::PodSelector;
use crate::validation::{FieldError, FieldPath, Root, Validator};

/// Methods accepted in `method`
pub const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

string_enum! {
    pub enum HttpChaosAction {
        Delay => "delay",
        Abort => "abort",
        Replace => "replace",
        Patch => "patch",
        Mixed => "mixed",
    }
}

string_enum! {
    /// Phase of the exchange the rule applies to
    pub enum HttpChaosTarget {
        Request => "Request",
        Response => "Response",
    }
}

/// Parts of the message replaced wholesale
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpReplaceActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Base64 encoded body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

crate::walk_fields! {
    HttpReplaceActions {}
    check = check_replace;
}

fn check_replace(replace: &HttpReplaceActions, path: &FieldPath, v: &mut Validator<'_>) {
    if let Some(body) = &replace.body
        && let Err(e) = STANDARD.decode(body)
    {
        v.push(FieldError::invalid(
            path.child("body"),
            body.as_str(),
            format!("body should be base64 encoded: {e}"),
        ));
    }
    if let Some(code) = replace.code {
        check_code(code, &path.child("code"), v);
    }
    if let Some(method) = &replace.method {
        check_method(method, &path.child("method"), v);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpPatchBodyAction {
    /// Patch format, only `JSON` is understood
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

/// Parts of the message appended to or merged
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpPatchActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<HttpPatchBodyAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Vec<String>>,
}

crate::walk_fields! {
    HttpPatchActions {}
    check = check_patch;
}

fn check_patch(patch: &HttpPatchActions, path: &FieldPath, v: &mut Validator<'_>) {
    if let Some(body) = &patch.body {
        if body.type_ != "JSON" {
            v.push(FieldError::not_supported(
                path.child("body").child("type"),
                body.type_.as_str(),
                &["JSON"],
            ));
        } else if let Err(e) = serde_json::from_str::<serde_json::Value>(&body.value) {
            v.push(FieldError::invalid(
                path.child("body").child("value"),
                body.value.as_str(),
                format!("invalid JSON patch body: {e}"),
            ));
        }
    }
    for (field, pairs) in [("queries", &patch.queries), ("headers", &patch.headers)] {
        for (i, pair) in pairs.iter().enumerate() {
            if pair.len() != 2 {
                v.push(FieldError::invalid(
                    path.child(field).index(i),
                    pair.clone(),
                    "should be a [key, value] pair",
                ));
            }
        }
    }
}

/// TLS material used to intercept HTTPS traffic
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpChaosTls {
    pub secret_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_namespace: String,
    pub cert_name: String,
    pub key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_name: Option<String>,
}

/// HTTPChaos injects faults into HTTP servers of the selected pods
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "HTTPChaos",
    plural = "httpchaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HTTPChaosSpec {
    #[serde(flatten)]
    pub pod_selector: PodSelector,

    #[serde(default)]
    pub action: HttpChaosAction,

    #[serde(default)]
    pub target: HttpChaosTarget,

    /// TCP port the target service listens on
    #[serde(default)]
    pub port: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Status code matched on responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    #[serde(default, rename = "request_headers", skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers: BTreeMap<String, String>,

    #[serde(default, rename = "response_headers", skip_serializing_if = "BTreeMap::is_empty")]
    pub response_headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<HttpReplaceActions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<HttpPatchActions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<HttpChaosTls>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    HTTPChaosSpec {
        pod_selector: "podSelector" => inline,
        delay: "delay" => leaf(Duration),
        replace: "replace" => nested,
        patch: "patch" => nested,
        duration: "duration" => leaf(Duration),
    }
    check = check_http_chaos;
}

fn check_code(code: i32, path: &FieldPath, v: &mut Validator<'_>) {
    if code <= 0 || code >= 1000 {
        v.push(FieldError::invalid(
            path.clone(),
            code,
            format!("status code {code} should be in (0, 1000)"),
        ));
    }
}

fn check_method(method: &str, path: &FieldPath, v: &mut Validator<'_>) {
    if !HTTP_METHODS.contains(&method) {
        v.push(FieldError::not_supported(path.clone(), method, HTTP_METHODS));
    }
}

fn check_http_chaos(spec: &HTTPChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
    if spec.port <= 0 || spec.port > 65535 {
        v.push(FieldError::invalid(
            path.child("port"),
            spec.port,
            format!("port {} is not in range 1-65535", spec.port),
        ));
    }
    v.extend(spec.target.check(path.child("target")));

    if spec.target == HttpChaosTarget::Request
        && let Some(method) = &spec.method
    {
        check_method(method, &path.child("method"), v);
    }
    if let Some(code) = spec.code {
        if spec.target == HttpChaosTarget::Response {
            check_code(code, &path.child("code"), v);
        } else {
            v.push(FieldError::invalid(
                path.child("code"),
                code,
                "code is only valid with target Response",
            ));
        }
    }

    let abort = spec.abort == Some(true);
    match spec.action {
        HttpChaosAction::Delay if spec.delay.as_deref().is_none_or(str::is_empty) => {
            v.push(FieldError::required(path.child("delay"), "delay is required on delay action"));
        }
        HttpChaosAction::Abort if !abort => {
            v.push(FieldError::invalid(
                path.child("abort"),
                spec.abort.unwrap_or_default(),
                "abort should be true on abort action",
            ));
        }
        HttpChaosAction::Replace if spec.replace.is_none() => {
            v.push(FieldError::required(
                path.child("replace"),
                "replace is required on replace action",
            ));
        }
        HttpChaosAction::Patch if spec.patch.is_none() => {
            v.push(FieldError::required(path.child("patch"), "patch is required on patch action"));
        }
        HttpChaosAction::Mixed
            if !abort && spec.delay.is_none() && spec.replace.is_none() && spec.patch.is_none() =>
        {
            v.push(FieldError::invalid(
                path.clone(),
                serde_json::Value::Null,
                "at least one of abort, delay, replace or patch is required on mixed action",
            ));
        }
        _ => {}
    }
}

impl Root for HTTPChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for HTTPChaosSpec {
    const SPEC_IMMUTABLE: bool = true;

    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Pod(&self.pod_selector))]
    }
}
