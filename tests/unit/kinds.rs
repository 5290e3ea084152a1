//! Action-conditional rules of every chaos kind, reviewed through the
//! dispatcher exactly as the webhook does

use serde_json::json;

use crate::common::*;
use chaos_admission::validation::FieldErrorKind;
use chaos_admission::{AdmissionError, ChaosKind, decode_chaos};

fn selected(spec: serde_json::Value) -> serde_json::Value {
    merged(one_pod_in("default"), spec)
}

fn assert_admitted(kind: &str, spec: serde_json::Value) {
    if let Err(e) = create(kind, spec) {
        panic!("expected {kind} to be admitted, got {e}");
    }
}

// =============================================================================
// Pod-based kinds
// =============================================================================

#[test]
fn test_pod_chaos_actions() {
    assert_admitted("PodChaos", selected(json!({"action": "pod-kill"})));
    assert_admitted("PodChaos", selected(json!({"action": "pod-failure", "duration": "30s"})));

    let errors = rejected("PodChaos", selected(json!({"action": "container-kill"})));
    assert!(errors.has_path("spec.containerNames"));

    assert_admitted(
        "PodChaos",
        selected(json!({"action": "container-kill", "containerNames": ["app"]})),
    );

    let errors = rejected("PodChaos", selected(json!({"action": "pod-explode"})));
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, FieldErrorKind::NotSupported);
    assert_eq!(error.path.to_string(), "spec.action");
}

#[test]
fn test_network_chaos_actions() {
    for action in ["delay", "loss", "duplicate", "corrupt", "bandwidth"] {
        let errors = rejected("NetworkChaos", selected(json!({"action": action})));
        assert!(errors.has_path(&format!("spec.{action}")), "{action}: {errors}");
    }

    assert_admitted(
        "NetworkChaos",
        selected(json!({"action": "delay", "delay": {"latency": "10ms"}})),
    );
    assert_admitted(
        "NetworkChaos",
        selected(json!({"action": "bandwidth", "bandwidth": {"rate": "1mbps", "limit": 100, "buffer": 10000}})),
    );

    let errors = rejected(
        "NetworkChaos",
        selected(json!({"action": "delay", "delay": {"latency": "ten"}})),
    );
    assert!(errors.has_path("spec.delay.latency"));
}

#[test]
fn test_network_direction_and_targets() {
    let errors = rejected(
        "NetworkChaos",
        selected(json!({
            "action": "delay",
            "delay": {"latency": "10ms"},
            "direction": "from",
            "externalTargets": ["1.1.1.1"]
        })),
    );
    assert!(errors.has_path("spec.direction"));

    let errors = rejected(
        "NetworkChaos",
        selected(json!({
            "action": "bandwidth",
            "bandwidth": {"rate": "1mbps", "limit": 100, "buffer": 10000},
            "direction": "from",
            "target": {"mode": "all"},
            "externalTargets": ["1.1.1.1"]
        })),
    );
    assert!(errors.has_path("spec.direction"));

    assert_admitted("NetworkChaos", selected(json!({"action": "partition"})));
    let errors = rejected(
        "NetworkChaos",
        selected(json!({"action": "partition", "direction": "both"})),
    );
    assert!(errors.has_path("spec.direction"));
    assert_admitted(
        "NetworkChaos",
        selected(json!({
            "action": "partition",
            "direction": "both",
            "externalTargets": ["example.com"]
        })),
    );

    // The target selector follows the same mode/value rules
    let errors = rejected(
        "NetworkChaos",
        selected(json!({
            "action": "partition",
            "target": {"selector": {"namespaces": ["other"]}, "mode": "fixed", "value": "0"}
        })),
    );
    assert!(errors.has_path("spec.target.value"));
}

#[test]
fn test_io_chaos_actions() {
    let base = || selected(json!({"volumePath": "/data"}));

    assert_admitted("IOChaos", merged(base(), json!({"action": "latency", "delay": "10ms"})));

    let errors = rejected("IOChaos", merged(base(), json!({"action": "latency"})));
    assert!(errors.has_path("spec.delay"));

    let errors = rejected("IOChaos", merged(base(), json!({"action": "latency", "delay": "slow"})));
    assert!(errors.has_path("spec.delay"));

    let errors = rejected("IOChaos", merged(base(), json!({"action": "fault"})));
    assert!(errors.has_path("spec.errno"));

    let errors = rejected("IOChaos", selected(json!({"action": "fault", "errno": 5})));
    assert!(errors.has_path("spec.volumePath"));

    let errors = rejected(
        "IOChaos",
        merged(base(), json!({"action": "fault", "errno": 5, "percent": 150})),
    );
    assert!(errors.has_path("spec.percent"));
}

#[test]
fn test_time_chaos_offset() {
    assert_admitted("TimeChaos", selected(json!({"timeOffset": "-10m"})));

    let errors = rejected("TimeChaos", selected(json!({"timeOffset": "yesterday"})));
    assert!(errors.has_path("spec.timeOffset"));

    let errors = rejected("TimeChaos", selected(json!({})));
    assert!(errors.has_path("spec.timeOffset"));
}

#[test]
fn test_stress_chaos_stressors() {
    assert_admitted(
        "StressChaos",
        selected(json!({"stressors": {"cpu": {"workers": 1, "load": 50}}})),
    );

    let errors = rejected("StressChaos", selected(json!({})));
    assert!(errors.to_string().contains("missing stressors"));

    let errors = rejected(
        "StressChaos",
        selected(json!({"stressors": {"memory": {"workers": 0, "size": "256MB"}}})),
    );
    assert!(errors.has_path("spec.stressors.memory.workers"));
}

#[test]
fn test_http_chaos_rules() {
    let base = || selected(json!({"target": "Request", "port": 80}));

    assert_admitted("HTTPChaos", merged(base(), json!({"action": "delay", "delay": "1s"})));

    let errors = rejected("HTTPChaos", merged(base(), json!({"action": "delay"})));
    assert!(errors.has_path("spec.delay"));

    let errors = rejected(
        "HTTPChaos",
        merged(base(), json!({"action": "abort", "abort": true, "port": 0})),
    );
    assert!(errors.has_path("spec.port"));

    let errors = rejected(
        "HTTPChaos",
        merged(base(), json!({"action": "abort", "abort": true, "method": "FETCH"})),
    );
    assert!(errors.has_path("spec.method"));

    let errors = rejected(
        "HTTPChaos",
        merged(base(), json!({"action": "abort", "abort": true, "target": "Sideways"})),
    );
    assert!(errors.has_path("spec.target"));
}

#[test]
fn test_dns_chaos_patterns() {
    assert_admitted(
        "DNSChaos",
        selected(json!({"action": "error", "patterns": ["google.com", "chaos-mesh.*"]})),
    );

    let errors = rejected(
        "DNSChaos",
        selected(json!({"action": "random", "patterns": ["ok.com", "*.com"]})),
    );
    assert!(errors.has_path("spec.patterns[1]"));
    assert!(!errors.has_path("spec.patterns[0]"));
}

#[test]
fn test_jvm_chaos_actions() {
    assert_admitted(
        "JVMChaos",
        selected(json!({"action": "latency", "latency": 100, "class": "Main", "method": "run"})),
    );

    let errors = rejected("JVMChaos", selected(json!({"action": "latency", "latency": 100})));
    assert!(errors.has_path("spec.class"));
    assert!(errors.has_path("spec.method"));

    let errors = rejected(
        "JVMChaos",
        selected(json!({"action": "latency", "class": "Main", "method": "run"})),
    );
    assert!(errors.has_path("spec.latency"));

    let errors = rejected("JVMChaos", selected(json!({"action": "ruleData"})));
    assert!(errors.has_path("spec.ruleData"));

    assert_admitted("JVMChaos", selected(json!({"action": "stress", "cpuCount": 2})));
    assert_admitted("JVMChaos", selected(json!({"action": "stress", "memType": "heap"})));
    let errors = rejected(
        "JVMChaos",
        selected(json!({"action": "stress", "cpuCount": 2, "memType": "heap"})),
    );
    assert!(errors.to_string().contains("not supported"));
    let errors = rejected("JVMChaos", selected(json!({"action": "stress", "memType": "disk"})));
    assert!(errors.has_path("spec.memType"));

    let errors = rejected("JVMChaos", selected(json!({"action": "mysql", "mysqlConnectorVersion": "8"})));
    assert!(errors.to_string().contains("exception and latency"));
}

#[test]
fn test_kernel_chaos_fail_type() {
    assert_admitted(
        "KernelChaos",
        selected(json!({"failKernRequest": {"failtype": 0, "probability": 50}})),
    );
    let errors = rejected(
        "KernelChaos",
        selected(json!({"failKernRequest": {"failtype": 3}})),
    );
    assert!(errors.has_path("spec.failKernRequest.failtype"));
}

#[test]
fn test_block_chaos_actions() {
    let base = || selected(json!({"volumeName": "data"}));

    assert_admitted("BlockChaos", merged(base(), json!({"action": "limit", "iops": 100})));
    assert_admitted(
        "BlockChaos",
        merged(base(), json!({"action": "delay", "delay": {"latency": "10ms"}})),
    );

    let errors = rejected("BlockChaos", merged(base(), json!({"action": "delay", "delay": {}})));
    assert!(errors.has_path("spec.delay.latency"));

    let errors = rejected("BlockChaos", merged(base(), json!({"action": "limit"})));
    assert!(errors.has_path("spec.iops"));

    let errors = rejected("BlockChaos", merged(base(), json!({"action": "wipe"})));
    assert!(errors.has_path("spec.action"));

    let errors = rejected("BlockChaos", selected(json!({"action": "limit", "iops": 1})));
    assert!(errors.has_path("spec.volumeName"));
}

// =============================================================================
// Cloud kinds
// =============================================================================

#[test]
fn test_aws_chaos_detach_volume() {
    let base = json!({"awsRegion": "us-east-1", "ec2Instance": "i-1"});

    assert_admitted("AWSChaos", merged(base.clone(), json!({"action": "ec2-stop"})));

    let errors = rejected("AWSChaos", merged(base.clone(), json!({"action": "detach-volume"})));
    assert!(errors.has_path("spec.ebsVolume"));
    assert!(errors.has_path("spec.deviceName"));

    assert_admitted(
        "AWSChaos",
        merged(
            base,
            json!({"action": "detach-volume", "ebsVolume": "vol-1", "deviceName": "/dev/sdf"}),
        ),
    );
}

#[test]
fn test_azure_chaos_disk_detach() {
    let base = json!({"subscriptionID": "sub", "resourceGroupName": "rg", "vmName": "vm"});

    assert_admitted("AzureChaos", merged(base.clone(), json!({"action": "vm-restart"})));

    let errors = rejected("AzureChaos", merged(base.clone(), json!({"action": "disk-detach"})));
    assert!(errors.has_path("spec.diskName"));
    assert!(errors.has_path("spec.lun"));

    assert_admitted(
        "AzureChaos",
        merged(base, json!({"action": "disk-detach", "diskName": "data", "lun": 0})),
    );
}

#[test]
fn test_gcp_chaos_disk_loss() {
    let base = json!({"project": "p", "zone": "z", "instance": "i"});

    assert_admitted("GCPChaos", merged(base.clone(), json!({"action": "node-reset"})));

    let errors = rejected("GCPChaos", merged(base.clone(), json!({"action": "disk-loss"})));
    assert!(errors.has_path("spec.deviceNames"));

    let errors = rejected(
        "GCPChaos",
        merged(base.clone(), json!({"action": "disk-loss", "deviceNames": []})),
    );
    assert!(errors.has_path("spec.deviceNames"));

    assert_admitted(
        "GCPChaos",
        merged(base, json!({"action": "disk-loss", "deviceNames": ["disk-1"]})),
    );
}

#[test]
fn test_yc_chaos_identity() {
    assert_admitted(
        "YCChaos",
        json!({"action": "compute-stop", "folderId": "f", "computeInstance": "c"}),
    );
    let errors = rejected("YCChaos", json!({"action": "compute-restart"}));
    assert!(errors.has_path("spec.folderId"));
    assert!(errors.has_path("spec.computeInstance"));
}

#[test]
fn test_k8s_chaos_api_objects() {
    assert_admitted(
        "K8SChaos",
        json!({"apiObjects": {"value": "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n"}}),
    );
    let errors = rejected("K8SChaos", json!({"apiObjects": {"value": ""}}));
    assert!(errors.has_path("spec.apiObjects.value"));
}

// =============================================================================
// Kind registry
// =============================================================================

#[test]
fn test_every_chaos_kind_is_dispatched() {
    let dispatcher = dispatcher();
    for kind in ChaosKind::ALL {
        assert!(dispatcher.kind(kind.as_str()).is_some(), "{kind}");
    }
    assert_eq!(dispatcher.kind_names().count(), ChaosKind::ALL.len() + 3);
    assert!(matches!(
        create("FooChaos", json!({})),
        Err(AdmissionError::UnknownKind(_))
    ));
}

#[test]
fn test_one_shot_predicates() {
    let cases = [
        ("PodChaos", json!({"action": "pod-kill"}), true),
        ("PodChaos", json!({"action": "container-kill"}), true),
        ("PodChaos", json!({"action": "pod-failure"}), false),
        ("AWSChaos", json!({"action": "ec2-restart"}), true),
        ("AWSChaos", json!({"action": "ec2-stop"}), false),
        ("AzureChaos", json!({"action": "vm-restart"}), true),
        ("GCPChaos", json!({"action": "node-reset"}), true),
        ("YCChaos", json!({"action": "compute-restart"}), true),
        ("NetworkChaos", json!({"action": "delay"}), false),
    ];
    for (kind, spec, one_shot) in cases {
        let chaos = decode_chaos(kind, object(kind, spec)).unwrap();
        assert_eq!(chaos.is_one_shot(), one_shot, "{kind}");
        assert_eq!(chaos.kind(), kind);
    }
}
