//! Schedule validation and defaulting

use serde_json::json;

use crate::common::*;
use chaos_admission::Schedule;
use chaos_admission::validation::FieldErrorKind;
use chrono::{TimeZone, Utc};

fn pod_kill_schedule(schedule: &str) -> serde_json::Value {
    json!({
        "schedule": schedule,
        "type": "PodChaos",
        "podChaos": {"action": "pod-kill", "mode": "one"}
    })
}

#[test]
fn test_chaos_schedule_defaults() {
    let spec = defaulted_spec("Schedule", pod_kill_schedule("@every 5m"));
    assert_eq!(spec["concurrencyPolicy"], json!("Forbid"));
    assert_eq!(spec["historyLimit"], json!(5));
    assert_eq!(spec["podChaos"]["selector"]["namespaces"], json!([TEST_NAMESPACE]));
}

#[test]
fn test_explicit_policy_kept() {
    let mut spec = pod_kill_schedule("0 * * * *");
    spec["concurrencyPolicy"] = json!("Allow");
    spec["historyLimit"] = json!(2);
    let spec = defaulted_spec("Schedule", spec);
    assert_eq!(spec["concurrencyPolicy"], json!("Allow"));
    assert_eq!(spec["historyLimit"], json!(2));
}

#[test]
fn test_invalid_cron() {
    let errors = rejected("Schedule", pod_kill_schedule("every tuesday"));
    assert!(errors.has_path("spec.schedule"));
    assert!(errors.to_string().contains("parse cron field error"));
}

#[test]
fn test_common_field_rules() {
    let mut spec = pod_kill_schedule("@hourly");
    spec["startingDeadlineSeconds"] = json!(-1);
    spec["historyLimit"] = json!(-2);
    spec["concurrencyPolicy"] = json!("Replace");
    let errors = rejected("Schedule", spec);
    assert!(errors.has_path("spec.startingDeadlineSeconds"));
    assert!(errors.has_path("spec.historyLimit"));
    assert!(errors.has_path("spec.concurrencyPolicy"));
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_embedded_chaos_required() {
    let errors = rejected("Schedule", json!({"schedule": "@hourly", "type": "NetworkChaos"}));
    assert!(errors.has_path("spec.networkChaos"));
    assert!(errors.to_string().contains("the value of chaos NetworkChaos is required"));
}

#[test]
fn test_embedded_chaos_validated() {
    let errors = rejected(
        "Schedule",
        json!({
            "schedule": "@hourly",
            "type": "PodChaos",
            "podChaos": {"action": "container-kill", "mode": "fixed", "value": "0"}
        }),
    );
    assert!(errors.has_path("spec.podChaos.containerNames"));
    assert!(errors.has_path("spec.podChaos.value"));
}

#[test]
fn test_schedule_type_rules() {
    let errors = rejected("Schedule", json!({"schedule": "@hourly"}));
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, FieldErrorKind::Required);
    assert_eq!(error.path.to_string(), "spec.type");

    let errors = rejected("Schedule", json!({"schedule": "@hourly", "type": "CoffeeChaos"}));
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, FieldErrorKind::NotSupported);
    assert!(error.supported.contains(&"Workflow".to_string()));

    let errors = rejected("Schedule", json!({"schedule": "@hourly", "type": "Workflow"}));
    assert!(errors.has_path("spec.workflow"));
}

#[test]
fn test_workflow_schedule_validates_nested_workflow() {
    let errors = rejected(
        "Schedule",
        json!({
            "schedule": "@hourly",
            "type": "Workflow",
            "workflow": {"entry": "missing", "templates": []}
        }),
    );
    assert!(errors.has_path("spec.workflow.templates"));
}

#[test]
fn test_next_activation() {
    let schedule: Schedule =
        serde_json::from_value(object("Schedule", pod_kill_schedule("30 * * * *"))).unwrap();
    let after = Utc.with_ymd_and_hms(2024, 5, 1, 8, 45, 0).unwrap();
    assert_eq!(
        schedule.spec.next_activation(after).unwrap(),
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
    );
}
