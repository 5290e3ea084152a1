//! Workflow validation: template names, references and per-type contents

use serde_json::json;

use crate::common::*;
use chaos_admission::validation::FieldErrorKind;
use chaos_admission::webhooks::Operation;
use chaos_admission::{AdmissionError, Workflow};

fn workflow(entry: &str, templates: serde_json::Value) -> serde_json::Value {
    json!({"entry": entry, "templates": templates})
}

fn pod_kill_template(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "templateType": "PodChaos",
        "deadline": "1m",
        "podChaos": {"action": "pod-kill", "mode": "one"}
    })
}

// =============================================================================
// Entry and names
// =============================================================================

#[test]
fn test_serial_workflow_accepted() {
    let spec = workflow(
        "entry",
        json!([
            {"name": "entry", "templateType": "Serial", "children": ["kill", "wait"]},
            pod_kill_template("kill"),
            {"name": "wait", "templateType": "Suspend", "deadline": "30s"}
        ]),
    );
    let spec = defaulted_spec("Workflow", spec);
    assert_eq!(
        spec["templates"][1]["podChaos"]["selector"]["namespaces"],
        json!([TEST_NAMESPACE])
    );
}

#[test]
fn test_unknown_entry() {
    let errors = rejected("Workflow", suspend_workflow_with_entry("missing"));
    let error = errors.iter().find(|e| e.path.to_string() == "spec.entry").unwrap();
    assert_eq!(error.kind, FieldErrorKind::Invalid);
    assert!(error.detail.contains("missing"));
}

fn suspend_workflow_with_entry(entry: &str) -> serde_json::Value {
    let mut spec = suspend_workflow("a");
    spec["entry"] = json!(entry);
    spec
}

#[test]
fn test_empty_entry_and_templates() {
    let errors = rejected("Workflow", workflow("", json!([])));
    assert!(errors.iter().any(|e| e.kind == FieldErrorKind::Required));
    assert!(errors.has_path("spec.templates"));
    assert!(errors.to_string().contains("templates in workflow could not be empty"));
}

#[test]
fn test_duplicate_names_reported_once() {
    let errors = rejected(
        "Workflow",
        workflow(
            "a",
            json!([
                {"name": "a", "templateType": "Suspend", "deadline": "1m"},
                {"name": "b", "templateType": "Suspend", "deadline": "1m"},
                {"name": "a", "templateType": "Suspend", "deadline": "1m"},
                {"name": "b", "templateType": "Suspend", "deadline": "1m"}
            ]),
        ),
    );
    let duplicates: Vec<_> = errors
        .iter()
        .filter(|e| e.detail.contains("must be unique"))
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].detail.ends_with("duplicated names: [a b]"));
}

#[test]
fn test_template_names_are_dns_subdomains() {
    let errors = rejected(
        "Workflow",
        workflow(
            "Bad_Name",
            json!([{"name": "Bad_Name", "templateType": "Suspend", "deadline": "1m"}]),
        ),
    );
    assert!(errors.has_path("spec.templates[0].name"));
    assert!(errors.to_string().contains("DNS-1123"));
}

#[test]
fn test_children_and_branches_must_exist() {
    let errors = rejected(
        "Workflow",
        workflow(
            "entry",
            json!([
                {"name": "entry", "templateType": "Parallel", "children": ["a", "ghost"]},
                {"name": "a", "templateType": "Suspend", "deadline": "1m"},
                {
                    "name": "task",
                    "templateType": "Task",
                    "task": {"container": {"name": "probe", "image": "busybox"}},
                    "conditionalBranches": [{"target": "a"}, {"target": "nowhere"}]
                }
            ]),
        ),
    );
    assert!(errors.has_path("spec.templates[0].children[1]"));
    assert!(!errors.has_path("spec.templates[0].children[0]"));
    assert!(errors.has_path("spec.templates[2].conditionalBranches[1].target"));
    assert_eq!(errors.len(), 2);
}

// =============================================================================
// Template types
// =============================================================================

#[test]
fn test_suspend_needs_deadline() {
    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "Suspend"}])),
    );
    assert!(errors.has_path("spec.templates[0].deadline"));
}

#[test]
fn test_suspend_must_not_carry_chaos() {
    let mut template = pod_kill_template("a");
    template["templateType"] = json!("Suspend");
    let errors = rejected("Workflow", workflow("a", json!([template])));
    assert!(errors.to_string().contains("this template should not contain any Chaos"));
}

#[test]
fn test_chaos_template_rejects_own_duration() {
    let mut template = pod_kill_template("a");
    template["podChaos"]["duration"] = json!("30s");
    let errors = rejected("Workflow", workflow("a", json!([template])));
    assert!(errors.has_path("spec.templates[0]"));
    assert!(errors.to_string().contains("use Template#Deadline instead"));
}

#[test]
fn test_chaos_template_requires_embedded_spec() {
    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "NetworkChaos", "deadline": "1m"}])),
    );
    assert!(errors.has_path("spec.templates[0].networkChaos"));
}

#[test]
fn test_chaos_template_validates_embedded_spec() {
    let errors = rejected(
        "Workflow",
        workflow(
            "a",
            json!([{
                "name": "a",
                "templateType": "PodChaos",
                "deadline": "1m",
                "podChaos": {"action": "container-kill", "mode": "one"}
            }]),
        ),
    );
    assert!(errors.has_path("spec.templates[0].podChaos.containerNames"));
}

#[test]
fn test_task_template() {
    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "Task"}])),
    );
    assert!(errors.has_path("spec.templates[0].task"));

    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "Task", "task": {}}])),
    );
    assert!(errors.has_path("spec.templates[0].task.container"));
}

#[test]
fn test_schedule_template() {
    let accepted = workflow(
        "a",
        json!([{
            "name": "a",
            "templateType": "Schedule",
            "deadline": "10m",
            "schedule": {
                "schedule": "@every 1m",
                "type": "PodChaos",
                "podChaos": {"action": "pod-kill", "mode": "one"}
            }
        }]),
    );
    let spec = defaulted_spec("Workflow", accepted);
    assert_eq!(spec["templates"][0]["schedule"]["concurrencyPolicy"], json!("Forbid"));

    let errors = rejected(
        "Workflow",
        workflow(
            "a",
            json!([{
                "name": "a",
                "templateType": "Schedule",
                "schedule": {"schedule": "@every 1m", "type": "Workflow"}
            }]),
        ),
    );
    assert!(errors.has_path("spec.templates[0].schedule.type"));

    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "Schedule"}])),
    );
    assert!(errors.has_path("spec.templates[0].schedule"));
}

#[test]
fn test_status_check_template() {
    let check = json!({
        "type": "HTTP",
        "http": {"url": "http://service:8080/health", "criteria": {"statusCode": "200-299"}}
    });
    let spec = defaulted_spec(
        "Workflow",
        workflow(
            "a",
            json!([{"name": "a", "templateType": "StatusCheck", "statusCheck": check}]),
        ),
    );
    let check = &spec["templates"][0]["statusCheck"];
    assert_eq!(check["mode"], json!("Synchronous"));
    assert_eq!(check["http"]["method"], json!("GET"));

    let errors = rejected(
        "Workflow",
        workflow(
            "a",
            json!([{
                "name": "a",
                "templateType": "StatusCheck",
                "statusCheck": {"type": "HTTP", "http": {"criteria": {"statusCode": "0"}}}
            }]),
        ),
    );
    assert!(errors.has_path("spec.templates[0].statusCheck.http.url"));
    assert!(errors.has_path("spec.templates[0].statusCheck.http.criteria.statusCode"));
}

#[test]
fn test_unknown_template_type() {
    let errors = rejected(
        "Workflow",
        workflow("a", json!([{"name": "a", "templateType": "Juggle"}])),
    );
    assert!(errors.has_path("spec.templates[0].templateType"));
    assert!(errors.to_string().contains("unrecognized template type: Juggle"));
}

// =============================================================================
// Runtime status
// =============================================================================

#[test]
fn test_status_reserved_on_create() {
    let mut value = object("Workflow", suspend_workflow("a"));
    value["status"] = json!({"entryNode": "a-xyz"});
    let err = review("Workflow", Operation::Create, Some(value.clone()), None).unwrap_err();
    match err {
        AdmissionError::Invalid(errors) => assert!(errors.has_path("status.entryNode")),
        other => panic!("unexpected error {other}"),
    }

    // The engine writes status later; updates carrying it are fine
    let old = object("Workflow", suspend_workflow("a"));
    assert!(review("Workflow", Operation::Update, Some(value), Some(old)).is_ok());
}

#[test]
fn test_accomplished_condition() {
    let mut value = object("Workflow", suspend_workflow("a"));
    value["status"] = json!({"conditions": [{"type": "Accomplished", "status": "True"}]});
    let workflow: Workflow = serde_json::from_value(value).unwrap();
    assert!(workflow.is_accomplished());
    assert_eq!(workflow.spec.template("a").unwrap().name, "a");
}
