//! Create/Update/Delete entry points of the kind dispatcher

use serde_json::json;

use crate::common::*;
use chaos_admission::AdmissionError;
use chaos_admission::webhooks::Operation;

fn kernel_spec(fail_type: i32) -> serde_json::Value {
    merged(
        one_pod_in("default"),
        json!({"failKernRequest": {"failtype": fail_type}}),
    )
}

// =============================================================================
// Create
// =============================================================================

#[test]
fn test_create_returns_spec_patch() {
    let decision = create("PodChaos", json!({"action": "pod-kill", "mode": "one"})).unwrap();
    let patch = decision.patch.unwrap();
    assert_eq!(patch[0]["op"], "add");
    assert_eq!(patch[0]["path"], "/spec");
    assert_eq!(patch[0]["value"]["selector"]["namespaces"], json!(["default"]));
    assert!(decision.warnings.is_empty());
}

#[test]
fn test_create_without_changes_has_no_patch() {
    let spec = merged(one_pod_in("default"), json!({"action": "pod-kill"}));
    let decision = create("PodChaos", spec).unwrap();
    assert!(decision.patch.is_none());
}

#[test]
fn test_paused_object_warns() {
    let value = paused_object("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    let decision = review("PodChaos", Operation::Create, Some(value), None).unwrap();
    assert_eq!(decision.warnings, vec!["experiment is created in paused state"]);
}

#[test]
fn test_all_errors_aggregated() {
    let err = create(
        "PodChaos",
        json!({"action": "container-kill", "mode": "fixed", "value": "x", "duration": "ever"}),
    )
    .unwrap_err();
    assert_eq!(err.reason(), "Invalid");
    let AdmissionError::Invalid(errors) = &err else {
        panic!("unexpected error {err}");
    };
    assert_eq!(errors.len(), 3);
    let message = err.to_string();
    assert!(message.starts_with('['));
    assert!(message.contains("spec.value"));
    assert!(message.contains("spec.duration"));
    assert!(message.contains("spec.containerNames"));
}

#[test]
fn test_missing_and_malformed_objects() {
    let err = review("PodChaos", Operation::Create, None, None).unwrap_err();
    assert!(matches!(err, AdmissionError::MissingObject("CREATE")));

    let err = create("PodChaos", json!({"action": "pod-kill", "gracePeriod": "soon"})).unwrap_err();
    assert!(matches!(err, AdmissionError::Decode(_)));
    assert_eq!(err.reason(), "BadRequest");
}

// =============================================================================
// Update
// =============================================================================

#[test]
fn test_immutable_kinds_reject_spec_changes() {
    let dispatcher = dispatcher();
    assert!(dispatcher.kind("HTTPChaos").unwrap().spec_immutable);
    assert!(dispatcher.kind("KernelChaos").unwrap().spec_immutable);
    assert!(!dispatcher.kind("PodChaos").unwrap().spec_immutable);

    let err = update("KernelChaos", kernel_spec(0), kernel_spec(1)).unwrap_err();
    assert!(matches!(err, AdmissionError::CannotUpdateChaos));
    assert_eq!(err.reason(), "Forbidden");

    assert!(update("KernelChaos", kernel_spec(1), kernel_spec(1)).is_ok());
}

#[test]
fn test_defaulting_is_applied_before_immutability_check() {
    // The stored object was defaulted on create; the update omits the default
    let stored = kernel_spec(0);
    let mut incoming = kernel_spec(0);
    incoming["selector"] = json!({});
    assert!(update("KernelChaos", stored, incoming).is_ok());
}

#[test]
fn test_mutable_kind_update_is_validated() {
    let old = merged(one_pod_in("default"), json!({"action": "pod-kill"}));
    let new = merged(one_pod_in("default"), json!({"action": "pod-failure"}));
    assert!(update("PodChaos", old.clone(), new).is_ok());

    let bad = merged(one_pod_in("default"), json!({"action": "container-kill"}));
    assert!(matches!(
        update("PodChaos", old, bad),
        Err(AdmissionError::Invalid(_))
    ));
}

#[test]
fn test_update_requires_old_object() {
    let spec = merged(one_pod_in("default"), json!({"action": "pod-kill"}));
    let err = review("PodChaos", Operation::Update, Some(object("PodChaos", spec)), None)
        .unwrap_err();
    assert!(matches!(err, AdmissionError::MissingObject("UPDATE")));
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_always_allowed() {
    let decision = review("HTTPChaos", Operation::Delete, None, None).unwrap();
    assert!(decision.patch.is_none());
    assert!(decision.warnings.is_empty());

    let garbage = json!({"spec": {"port": "not a number"}});
    assert!(review("HTTPChaos", Operation::Delete, None, Some(garbage)).is_ok());
}
