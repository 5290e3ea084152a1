//! Schedule migration of pre-v2 manifests

use serde::Deserialize;
use serde_yaml::Value;

use crate::common::*;
use chaos_admission::Schedule;
use chaos_admission::migrate::{MigrationError, migrate_documents};

const LEGACY_MANIFEST: &str = r#"
apiVersion: chaos-mesh.org/v1alpha1
kind: NetworkChaos
metadata:
  name: web-delay
  namespace: default
spec:
  action: delay
  mode: one
  selector:
    namespaces: [default]
  delay:
    latency: 10ms
  scheduler:
    cron: "@every 2m"
---
apiVersion: chaos-mesh.org/v1alpha1
kind: IoChaos
metadata:
  name: io-latency
spec:
  action: latency
  mode: all
  containerName: app
  volumePath: /data
  delay: 10ms
"#;

fn documents(output: &str) -> Vec<Value> {
    serde_yaml::Deserializer::from_str(output)
        .map(|d| Value::deserialize(d).unwrap())
        .collect()
}

#[test]
fn test_migrated_schedule_is_admitted() {
    let output = migrate_documents(LEGACY_MANIFEST).unwrap();
    let migrated = documents(&output);
    assert_eq!(migrated.len(), 2);

    let schedule = serde_json::to_value(&migrated[0]).unwrap();
    assert_eq!(schedule["kind"], "Schedule");
    assert_eq!(schedule["spec"]["type"], "NetworkChaos");
    assert_eq!(schedule["spec"]["networkChaos"]["delay"]["latency"], "10ms");

    let typed: Schedule = serde_json::from_value(schedule.clone()).unwrap();
    assert_eq!(typed.spec.schedule, "@every 2m");

    assert!(create("Schedule", schedule["spec"].clone()).is_ok());
}

#[test]
fn test_rewritten_chaos_is_admitted() {
    let output = migrate_documents(LEGACY_MANIFEST).unwrap();
    let io = serde_json::to_value(&documents(&output)[1]).unwrap();
    assert_eq!(io["kind"], "IOChaos");
    assert_eq!(io["spec"]["containerNames"], serde_json::json!(["app"]));
    assert!(io["spec"].get("containerName").is_none());
    assert!(create("IOChaos", io["spec"].clone()).is_ok());
}

#[test]
fn test_refuses_dns_scope() {
    let err = migrate_documents(
        "kind: DNSChaos\nmetadata:\n  name: dns\nspec:\n  action: error\n  scope: inner\n",
    )
    .unwrap_err();
    match err {
        MigrationError::Unsupported { kind, name, .. } => {
            assert_eq!(kind, "DNSChaos");
            assert_eq!(name, "dns");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_invalid_yaml() {
    assert!(matches!(
        migrate_documents("kind: [unterminated"),
        Err(MigrationError::Yaml(_))
    ));
}
