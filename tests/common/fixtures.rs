//! Test fixtures for chaos admission objects
//!
//! Objects are built as JSON, the way the API server hands them to the
//! webhook, and reviewed through the same dispatcher the server uses.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let decision = create("PodChaos", json!({"action": "pod-kill", "mode": "one"})).unwrap();
//! let errors = rejected("PodChaos", json!({"action": "container-kill", "mode": "one"}));
//! assert!(errors.has_path("spec.containerNames"));
//! ```

use chaos_admission::validation::{self, ErrorList, Registry};
use chaos_admission::webhooks::{Decision, Operation, ReviewInput};
use chaos_admission::{AdmissionError, Dispatcher};
use serde_json::{Value, json};

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_NAME: &str = "test";

// =============================================================================
// Registry and dispatcher
// =============================================================================

/// Process-wide registry, initialized on first use
pub fn registry() -> &'static Registry {
    validation::init().expect("builtin tags register without conflict")
}

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(registry())
}

// =============================================================================
// Object builders
// =============================================================================

/// A namespaced object of `kind` wrapping `spec`
pub fn object(kind: &str, spec: Value) -> Value {
    json!({
        "apiVersion": "chaos-mesh.org/v1alpha1",
        "kind": kind,
        "metadata": {"name": TEST_NAME, "namespace": TEST_NAMESPACE},
        "spec": spec
    })
}

/// Same as [`object`] with the pause annotation set
pub fn paused_object(kind: &str, spec: Value) -> Value {
    let mut value = object(kind, spec);
    value["metadata"]["annotations"] = json!({"experiment.chaos-mesh.org/pause": "true"});
    value
}

/// A pod selector picking one pod in `namespace`
pub fn one_pod_in(namespace: &str) -> Value {
    json!({"selector": {"namespaces": [namespace]}, "mode": "one"})
}

/// Merge the object entries of `extra` into `base`
pub fn merged(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

/// A workflow spec with a single suspend template named `entry`
pub fn suspend_workflow(entry: &str) -> Value {
    json!({
        "entry": entry,
        "templates": [{"name": entry, "templateType": "Suspend", "deadline": "1m"}]
    })
}

// =============================================================================
// Review helpers
// =============================================================================

pub fn review(
    kind: &str,
    operation: Operation,
    object: Option<Value>,
    old: Option<Value>,
) -> Result<Decision, AdmissionError> {
    dispatcher().review(
        kind,
        ReviewInput {
            operation,
            namespace: Some(TEST_NAMESPACE),
            object,
            old_object: old,
        },
    )
}

/// Review the creation of `kind` with `spec`
pub fn create(kind: &str, spec: Value) -> Result<Decision, AdmissionError> {
    review(kind, Operation::Create, Some(object(kind, spec)), None)
}

/// Review an update of `kind` from `old` to `new`
pub fn update(kind: &str, old: Value, new: Value) -> Result<Decision, AdmissionError> {
    review(
        kind,
        Operation::Update,
        Some(object(kind, new)),
        Some(object(kind, old)),
    )
}

/// The field errors of a create that must be rejected
pub fn rejected(kind: &str, spec: Value) -> ErrorList {
    match create(kind, spec) {
        Err(AdmissionError::Invalid(errors)) => errors,
        Err(other) => panic!("expected field errors for {kind}, got {other}"),
        Ok(decision) => panic!("expected {kind} to be rejected, got {decision:?}"),
    }
}

/// The spec after defaulting, taken from the create patch
pub fn defaulted_spec(kind: &str, spec: Value) -> Value {
    let decision = create(kind, spec.clone()).expect("object is admitted");
    match decision.patch {
        Some(patch) => patch[0]["value"].clone(),
        None => spec,
    }
}
