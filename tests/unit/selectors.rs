//! Selector mode/value rules and namespace defaulting

use serde_json::json;

use crate::common::*;
use chaos_admission::crd::{PodSelectorSpec, SelectorMode, SelectorRef, check_mode_value};
use chaos_admission::decode_chaos;
use chaos_admission::validation::{FieldErrorKind, FieldPath};

fn pod_kill(mode: &str, value: &str) -> serde_json::Value {
    json!({
        "action": "pod-kill",
        "selector": {"namespaces": ["default"]},
        "mode": mode,
        "value": value
    })
}

// =============================================================================
// Mode/value
// =============================================================================

#[test]
fn test_mode_value_through_admission() {
    let accepted = [
        ("one", ""),
        ("all", ""),
        ("fixed", "1"),
        ("fixed", "20"),
        ("fixed-percent", "100"),
        ("random-max-percent", "1"),
    ];
    for (mode, value) in accepted {
        assert!(create("PodChaos", pod_kill(mode, value)).is_ok(), "{mode} {value}");
    }

    let rejected_cases = [
        ("fixed", "0"),
        ("fixed", "-1"),
        ("fixed", "two"),
        ("fixed-percent", "0"),
        ("fixed-percent", "101"),
        ("random-max-percent", "50%"),
    ];
    for (mode, value) in rejected_cases {
        let errors = rejected("PodChaos", pod_kill(mode, value));
        assert!(errors.has_path("spec.value"), "{mode} {value}: {errors}");
    }
}

#[test]
fn test_mode_is_required_and_enumerated() {
    let errors = rejected("PodChaos", json!({"action": "pod-kill"}));
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, FieldErrorKind::Required);
    assert_eq!(error.path.to_string(), "spec.mode");

    let errors = rejected("PodChaos", pod_kill("some", ""));
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, FieldErrorKind::NotSupported);
    assert!(error.supported.contains(&"fixed-percent".to_string()));
}

#[test]
fn test_check_mode_value_messages() {
    let path = FieldPath::new("spec").child("target");
    let errors = check_mode_value(&SelectorMode::FixedPercent, "150", &path);
    assert_eq!(
        errors.to_string(),
        "spec.target.value: Invalid value: \"150\": value of 150 is invalid, Must be (0,100] with mode:fixed-percent"
    );
    assert!(check_mode_value(&SelectorMode::All, "anything", &path).is_empty());
}

// =============================================================================
// Namespace defaulting
// =============================================================================

#[test]
fn test_namespace_defaults_to_object_namespace() {
    let spec = defaulted_spec("PodChaos", json!({"action": "pod-kill", "mode": "one"}));
    assert_eq!(spec["selector"]["namespaces"], json!([TEST_NAMESPACE]));
}

#[test]
fn test_explicit_namespaces_are_kept() {
    let spec = defaulted_spec(
        "PodChaos",
        json!({"action": "pod-kill", "mode": "all", "selector": {"namespaces": ["a", "b"]}}),
    );
    assert_eq!(spec["selector"]["namespaces"], json!(["a", "b"]));
}

#[test]
fn test_network_target_namespace_defaulted() {
    let spec = defaulted_spec(
        "NetworkChaos",
        json!({
            "action": "partition",
            "mode": "one",
            "target": {"mode": "all"}
        }),
    );
    assert_eq!(spec["target"]["selector"]["namespaces"], json!([TEST_NAMESPACE]));
    assert_eq!(spec["direction"], json!("to"));
}

#[test]
fn test_cluster_scoped() {
    let empty = PodSelectorSpec::default();
    assert!(empty.cluster_scoped());

    let pods: PodSelectorSpec =
        serde_json::from_value(json!({"pods": {"ns": ["pod-0"]}})).unwrap();
    assert!(!pods.cluster_scoped());
    assert_eq!(pods.affected_namespaces(), vec!["ns"]);

    let labelled: PodSelectorSpec =
        serde_json::from_value(json!({"labelSelectors": {"app": "web"}})).unwrap();
    assert!(labelled.cluster_scoped());
}

// =============================================================================
// Selector specs
// =============================================================================

#[test]
fn test_selector_specs_by_path() {
    let chaos = decode_chaos(
        "NetworkChaos",
        object(
            "NetworkChaos",
            json!({
                "action": "partition",
                "mode": "one",
                "target": {"mode": "all", "selector": {"namespaces": ["other"]}}
            }),
        ),
    )
    .unwrap();
    let specs = chaos.selector_specs();
    let paths: Vec<&str> = specs.iter().map(|(path, _)| *path).collect();
    assert_eq!(paths, vec![".", ".target"]);
    match specs[1].1 {
        SelectorRef::Pod(target) => assert_eq!(target.selector.namespaces, vec!["other"]),
        other => panic!("unexpected selector {other:?}"),
    }
}

#[test]
fn test_physical_machine_selector() {
    let spec = defaulted_spec(
        "PhysicalMachineChaos",
        json!({
            "action": "stress-cpu",
            "address": ["1.2.3.4:1", "https://5.6.7.8:2"],
            "stress-cpu": {"load": 10, "workers": 1}
        }),
    );
    assert_eq!(spec["address"], json!(["http://1.2.3.4:1", "https://5.6.7.8:2"]));

    let errors = rejected(
        "PhysicalMachineChaos",
        json!({"action": "stress-cpu", "stress-cpu": {"load": 10, "workers": 1}}),
    );
    assert!(errors.has_path("spec.address"));

    // A mode alone does not stand in for a selector
    let errors = rejected(
        "PhysicalMachineChaos",
        json!({"action": "stress-cpu", "mode": "all", "stress-cpu": {"load": 10, "workers": 1}}),
    );
    assert!(errors.to_string().contains("one of address or selector should be specified"));

    let errors = rejected(
        "PhysicalMachineChaos",
        json!({
            "action": "stress-cpu",
            "address": ["1.2.3.4:1"],
            "selector": {"namespaces": ["default"]},
            "mode": "one",
            "stress-cpu": {"load": 10, "workers": 1}
        }),
    );
    assert!(errors.to_string().contains("only one of address or selector"));
}
