//! Rewriting of pre-v2 chaos documents
//!
//! Old manifests scheduled experiments inline through `spec.scheduler.cron`
//! and used a few field shapes that no longer exist. [`migrate_documents`]
//! lifts scheduled experiments into `Schedule` objects and rewrites the
//! renamed fields; documents of other kinds pass through untouched.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::crd::{ChaosKind, GROUP, VERSION};

const LEGACY_IO_CHAOS: &str = "IoChaos";
const MIGRATED_HISTORY_LIMIT: u64 = 1;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("document {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("cannot migrate {kind} {name}: {reason}")]
    Unsupported {
        kind: String,
        name: String,
        reason: String,
    },
}

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;

/// Migrate every `---` separated document in `input`
pub fn migrate_documents(input: &str) -> Result<String> {
    let mut output = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let migrated = migrate_document(index, value)?;
        output.push(serde_yaml::to_string(&migrated)?);
    }
    Ok(output.join("---\n"))
}

/// Migrate one document; `index` only labels errors
pub fn migrate_document(index: usize, document: Value) -> Result<Value> {
    let Value::Mapping(mut document) = document else {
        return Err(malformed(index, "document is not a mapping"));
    };

    let Some(mut kind) = document.get("kind").and_then(Value::as_str).map(str::to_string) else {
        return Ok(Value::Mapping(document));
    };
    if kind == LEGACY_IO_CHAOS {
        kind = ChaosKind::IOChaos.as_str().to_string();
        document.insert("kind".into(), Value::from(kind.clone()));
    }
    let Some(chaos_kind) = ChaosKind::from_name(&kind) else {
        return Ok(Value::Mapping(document));
    };

    let name = document
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let spec = match document.remove("spec") {
        Some(Value::Mapping(spec)) => spec,
        Some(_) => return Err(malformed(index, "spec is not a mapping")),
        None => return Err(malformed(index, "spec is missing")),
    };
    let mut spec = rewrite_spec(chaos_kind, &name, spec)?;

    let cron = match spec.remove("scheduler") {
        None => None,
        Some(scheduler) => match scheduler.get("cron").and_then(Value::as_str) {
            Some(cron) => Some(cron.to_string()),
            None => return Err(malformed(index, "scheduler has no cron")),
        },
    };

    let Some(cron) = cron else {
        document.insert("spec".into(), Value::Mapping(spec));
        return Ok(Value::Mapping(document));
    };

    Ok(Value::Mapping(into_schedule(chaos_kind, &document, cron, spec)))
}

fn rewrite_spec(kind: ChaosKind, name: &str, mut spec: Mapping) -> Result<Mapping> {
    if let Some(container) = spec.remove("containerName")
        && !spec.contains_key("containerNames")
    {
        spec.insert("containerNames".into(), Value::Sequence(vec![container]));
    }

    if kind == ChaosKind::DNSChaos
        && let Some(scope) = spec.remove("scope")
    {
        match scope.as_str() {
            Some("all") => {
                spec.insert("patterns".into(), Value::Sequence(vec![Value::from("*")]));
            }
            other => {
                return Err(MigrationError::Unsupported {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    reason: format!(
                        "scope {} cannot be expressed as patterns, only `all` is migrated",
                        other.unwrap_or("<non-string>")
                    ),
                });
            }
        }
    }

    Ok(spec)
}

fn into_schedule(kind: ChaosKind, document: &Mapping, cron: String, spec: Mapping) -> Mapping {
    let mut metadata = Mapping::new();
    if let Some(Value::Mapping(old)) = document.get("metadata") {
        for key in ["name", "namespace", "labels", "annotations"] {
            if let Some(value) = old.get(key) {
                metadata.insert(key.into(), value.clone());
            }
        }
    }

    let mut schedule_spec = Mapping::new();
    schedule_spec.insert("schedule".into(), Value::from(cron));
    schedule_spec.insert("type".into(), Value::from(kind.as_str()));
    schedule_spec.insert("historyLimit".into(), Value::from(MIGRATED_HISTORY_LIMIT));
    schedule_spec.insert("concurrencyPolicy".into(), Value::from("Forbid"));
    schedule_spec.insert(kind.json_key().into(), Value::Mapping(spec));

    let mut schedule = Mapping::new();
    schedule.insert("apiVersion".into(), Value::from(format!("{GROUP}/{VERSION}")));
    schedule.insert("kind".into(), Value::from("Schedule"));
    schedule.insert("metadata".into(), Value::Mapping(metadata));
    schedule.insert("spec".into(), Value::Mapping(schedule_spec));
    schedule
}

fn malformed(index: usize, reason: &str) -> MigrationError {
    MigrationError::Malformed {
        index,
        reason: reason.to_string(),
    }
}
