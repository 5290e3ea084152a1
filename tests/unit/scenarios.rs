//! End-to-end admission scenarios

use serde_json::json;

use crate::common::*;
use chaos_admission::validation::FieldErrorKind;

#[test]
fn test_aws_detach_volume_without_volume_id() {
    let errors = rejected(
        "AWSChaos",
        json!({"action": "detach-volume", "awsRegion": "us-east-1"}),
    );
    for path in ["spec.ebsVolume", "spec.deviceName"] {
        let error = errors.iter().find(|e| e.path.to_string() == path).unwrap();
        assert_eq!(error.kind, FieldErrorKind::Required);
    }
}

#[test]
fn test_pod_container_kill_without_container_names() {
    let errors = rejected(
        "PodChaos",
        json!({"action": "container-kill", "selector": {"namespaces": ["default"]}, "mode": "one"}),
    );
    assert!(errors.to_string().contains("containerNames"));
}

#[test]
fn test_http_valid_delay() {
    let spec = defaulted_spec(
        "HTTPChaos",
        json!({
            "target": "Request",
            "port": 80,
            "action": "delay",
            "delay": "1s",
            "selector": {"namespaces": ["default"]},
            "mode": "one"
        }),
    );
    assert_eq!(spec["selector"]["namespaces"], json!(["default"]));
}

#[test]
fn test_schedule_with_six_field_cron() {
    let spec = defaulted_spec(
        "Schedule",
        json!({
            "schedule": "*/1 * * * * *",
            "type": "Workflow",
            "workflow": {
                "entry": "e",
                "templates": [{"name": "e", "templateType": "Suspend", "deadline": "1m"}]
            }
        }),
    );
    assert_eq!(spec["concurrencyPolicy"], json!("Forbid"));
}

#[test]
fn test_workflow_with_unknown_entry() {
    let errors = rejected(
        "Workflow",
        json!({
            "entry": "missing",
            "templates": [{"name": "a", "templateType": "Suspend", "deadline": "1m"}]
        }),
    );
    let error = errors.iter().find(|e| e.path.to_string() == "spec.entry").unwrap();
    assert_eq!(error.kind, FieldErrorKind::Invalid);
}

#[test]
fn test_physical_machine_stress_cpu_workers() {
    let errors = rejected(
        "PhysicalMachineChaos",
        json!({
            "address": ["1.2.3.4:1"],
            "action": "stress-cpu",
            "stress-cpu": {"load": 10, "workers": 0}
        }),
    );
    assert!(errors.to_string().contains("workers can't be 0"));

    let spec = defaulted_spec(
        "PhysicalMachineChaos",
        json!({
            "address": ["1.2.3.4:1"],
            "action": "stress-cpu",
            "stress-cpu": {"load": 10, "workers": 1}
        }),
    );
    assert_eq!(spec["address"][0], json!("http://1.2.3.4:1"));
}
