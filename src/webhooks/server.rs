//! Webhook HTTP server handlers
//!
//! Implements the mutating and validating admission endpoints on top of
//! the kind dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kube::core::admission::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::dispatcher::{Decision, Dispatcher, ReviewInput};
use super::{WebhookConfig, WebhookError};
use crate::error::AdmissionError;
use crate::health::HealthState;

/// Kubernetes AdmissionReview request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub request: Option<AdmissionRequest>,
}

/// AdmissionRequest contains the details of the admission request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    pub operation: Operation,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub object: Option<Value>,
    pub old_object: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub kind: String,
}

/// AdmissionReview response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

/// AdmissionResponse contains the result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
    /// Base64 encoded JSON patch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared state for webhook handlers
pub struct WebhookState {
    pub dispatcher: Dispatcher,
    pub health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(dispatcher: Dispatcher, health: Option<Arc<HealthState>>) -> Self {
        Self { dispatcher, health }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate))
        .route("/validate", post(validate))
        .with_state(state)
}

async fn mutate(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview>,
) -> impl IntoResponse {
    handle(&state, review, true)
}

async fn validate(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview>,
) -> impl IntoResponse {
    handle(&state, review, false)
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

fn handle(
    state: &WebhookState,
    review: AdmissionReview,
    mutating: bool,
) -> (StatusCode, Json<AdmissionReviewResponse>) {
    let Some(request) = review.request else {
        error!("Admission review missing request");
        return (
            StatusCode::BAD_REQUEST,
            Json(denied_response(
                "",
                "Missing request in AdmissionReview",
                "BadRequest",
            )),
        );
    };

    let started = Instant::now();
    let uid = request.uid;
    let kind = request.kind.kind;
    let operation = operation_name(&request.operation);
    info!(
        uid = %uid,
        kind = %kind,
        operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing admission request"
    );

    let result = state.dispatcher.review(
        &kind,
        ReviewInput {
            operation: request.operation,
            namespace: request.namespace.as_deref(),
            object: request.object,
            old_object: request.old_object,
        },
    );

    let response = match result {
        Ok(decision) => {
            info!(uid = %uid, kind = %kind, operation, "Admission request allowed");
            allowed_response(&uid, decision, mutating)
        }
        Err(e) => {
            if matches!(e, AdmissionError::Decode(_)) {
                error!(uid = %uid, kind = %kind, error = %e, "Failed to decode object");
            } else {
                warn!(uid = %uid, kind = %kind, operation, reason = e.reason(), error = %e, "Admission request denied");
            }
            denied_response(&uid, &e.to_string(), e.reason())
        }
    };

    if let Some(health) = &state.health {
        health.metrics.record_request(
            &kind,
            operation,
            response.response.allowed,
            started.elapsed().as_secs_f64(),
        );
    }

    (StatusCode::OK, Json(response))
}

fn review_response(response: AdmissionResponse) -> AdmissionReviewResponse {
    AdmissionReviewResponse {
        api_version: "admission.k8s.io/v1".to_string(),
        kind: "AdmissionReview".to_string(),
        response,
    }
}

fn allowed_response(uid: &str, decision: Decision, mutating: bool) -> AdmissionReviewResponse {
    let patch = decision
        .patch
        .filter(|_| mutating)
        .map(|patch| STANDARD.encode(patch.to_string()));
    review_response(AdmissionResponse {
        uid: uid.to_string(),
        allowed: true,
        status: None,
        patch_type: patch.as_ref().map(|_| "JSONPatch".to_string()),
        patch,
        warnings: decision.warnings,
    })
}

fn denied_response(uid: &str, message: &str, reason: &str) -> AdmissionReviewResponse {
    review_response(AdmissionResponse {
        uid: uid.to_string(),
        allowed: false,
        status: Some(AdmissionStatus {
            code: 403,
            message: message.to_string(),
            reason: Some(reason.to_string()),
        }),
        patch: None,
        patch_type: None,
        warnings: Vec::new(),
    })
}

/// Run the webhook server with TLS on `0.0.0.0:config.port`
pub async fn run_webhook_server(
    config: &WebhookConfig,
    state: Arc<WebhookState>,
) -> Result<(), WebhookError> {
    let app = create_webhook_router(state);

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(WebhookError::TlsConfig)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(WebhookError::Server)?;

    Ok(())
}
