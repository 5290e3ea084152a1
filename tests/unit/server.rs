//! Admission endpoints served over HTTP

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::common::*;
use chaos_admission::{HealthState, WebhookState, create_webhook_router};

fn admission_review(
    kind: &str,
    operation: &str,
    object: Option<Value>,
    old: Option<Value>,
) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "chaos-mesh.org", "version": "v1alpha1", "kind": kind},
            "operation": operation,
            "namespace": TEST_NAMESPACE,
            "name": TEST_NAME,
            "object": object,
            "oldObject": old
        }
    })
}

async fn post(state: Arc<WebhookState>, uri: &str, body: Value) -> (StatusCode, Value) {
    let router = create_webhook_router(state);
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn state() -> Arc<WebhookState> {
    Arc::new(WebhookState::new(dispatcher(), None))
}

fn decoded_patch(response: &Value) -> Value {
    let patch = response["response"]["patch"].as_str().unwrap();
    serde_json::from_slice(&STANDARD.decode(patch).unwrap()).unwrap()
}

// =============================================================================
// Mutating endpoint
// =============================================================================

#[tokio::test]
async fn test_mutate_returns_json_patch() {
    let object = object("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    let (status, body) = post(
        state(),
        "/mutate",
        admission_review("PodChaos", "CREATE", Some(object), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "AdmissionReview");
    assert_eq!(body["response"]["uid"], "705ab4f5-6393-11e8-b7cc-42010a800002");
    assert_eq!(body["response"]["allowed"], true);
    assert_eq!(body["response"]["patchType"], "JSONPatch");

    let patch = decoded_patch(&body);
    assert_eq!(patch[0]["path"], "/spec");
    assert_eq!(patch[0]["value"]["selector"]["namespaces"], json!([TEST_NAMESPACE]));
}

#[tokio::test]
async fn test_mutate_without_changes_has_no_patch() {
    let spec = merged(one_pod_in("default"), json!({"action": "pod-kill"}));
    let (_, body) = post(
        state(),
        "/mutate",
        admission_review("PodChaos", "CREATE", Some(object("PodChaos", spec)), None),
    )
    .await;
    assert_eq!(body["response"]["allowed"], true);
    assert!(body["response"].get("patch").is_none());
    assert!(body["response"].get("patchType").is_none());
}

// =============================================================================
// Validating endpoint
// =============================================================================

#[tokio::test]
async fn test_validate_never_patches() {
    let object = object("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    let (_, body) = post(
        state(),
        "/validate",
        admission_review("PodChaos", "CREATE", Some(object), None),
    )
    .await;
    assert_eq!(body["response"]["allowed"], true);
    assert!(body["response"].get("patch").is_none());
}

#[tokio::test]
async fn test_validate_denies_with_field_errors() {
    let object = object("PodChaos", json!({"action": "container-kill", "mode": "one"}));
    let (status, body) = post(
        state(),
        "/validate",
        admission_review("PodChaos", "CREATE", Some(object), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["allowed"], false);
    assert_eq!(body["response"]["status"]["code"], 403);
    assert_eq!(body["response"]["status"]["reason"], "Invalid");
    let message = body["response"]["status"]["message"].as_str().unwrap();
    assert!(message.contains("spec.containerNames"));
}

#[tokio::test]
async fn test_validate_forbids_immutable_update() {
    let old = object(
        "HTTPChaos",
        merged(
            one_pod_in("default"),
            json!({"target": "Request", "port": 80, "action": "delay", "delay": "1s"}),
        ),
    );
    let mut new = old.clone();
    new["spec"]["port"] = json!(8080);

    let (_, body) = post(
        state(),
        "/validate",
        admission_review("HTTPChaos", "UPDATE", Some(new), Some(old)),
    )
    .await;
    assert_eq!(body["response"]["allowed"], false);
    assert_eq!(body["response"]["status"]["reason"], "Forbidden");
    assert_eq!(body["response"]["status"]["message"], "Cannot update chaos spec");
}

#[tokio::test]
async fn test_paused_warning_is_returned() {
    let object = paused_object("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    let (_, body) = post(
        state(),
        "/validate",
        admission_review("PodChaos", "CREATE", Some(object), None),
    )
    .await;
    assert_eq!(body["response"]["allowed"], true);
    assert_eq!(
        body["response"]["warnings"],
        json!(["experiment is created in paused state"])
    );
}

#[tokio::test]
async fn test_unknown_kind_is_bad_request() {
    let (_, body) = post(
        state(),
        "/validate",
        admission_review("Deployment", "CREATE", Some(json!({})), None),
    )
    .await;
    assert_eq!(body["response"]["allowed"], false);
    assert_eq!(body["response"]["status"]["reason"], "BadRequest");
}

#[tokio::test]
async fn test_missing_request() {
    let (status, body) = post(
        state(),
        "/validate",
        json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["response"]["allowed"], false);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_decisions_are_counted() {
    let health = Arc::new(HealthState::new());
    let state = Arc::new(WebhookState::new(dispatcher(), Some(health.clone())));

    let allowed = object("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    let denied = object("PodChaos", json!({"action": "pod-kill"}));
    post(
        state.clone(),
        "/validate",
        admission_review("PodChaos", "CREATE", Some(allowed), None),
    )
    .await;
    post(
        state,
        "/validate",
        admission_review("PodChaos", "CREATE", Some(denied), None),
    )
    .await;

    let metrics = health.metrics.encode();
    assert!(metrics.contains(
        r#"chaos_admission_requests_total{kind="PodChaos",operation="CREATE",allowed="true"} 1"#
    ));
    assert!(metrics.contains(
        r#"chaos_admission_requests_total{kind="PodChaos",operation="CREATE",allowed="false"} 1"#
    ));
}
