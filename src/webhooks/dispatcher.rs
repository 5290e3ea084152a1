//! Admission decisions per kind
//!
//! Every admitted kind gets the same three entry points. Create defaults
//! the spec, then validates it; Update additionally enforces spec
//! immutability for kinds that ask for it; Delete always succeeds.

use std::collections::BTreeMap;
use std::fmt::Debug;

use kube::Resource;
use kube::core::admission::Operation;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::crd::{
    PAUSED_WARNING, Schedule, ScheduleSpec, StatusCheck, StatusCheckSpec, Workflow, WorkflowSpec,
    chaos_kind_entries, is_paused,
};
use crate::error::{AdmissionError, Result};
use crate::validation::{ErrorList, FieldPath, Registry, Root, Walk, default_tree, validate_tree};

/// A resource kind the webhook admits
pub trait AdmissionObject:
    Resource<DynamicType = ()> + DeserializeOwned + Serialize + Clone + Debug + Send + Sync
{
    type Spec: Walk + Root + PartialEq + Serialize;

    /// Reject updates that change the spec
    const SPEC_IMMUTABLE: bool = false;

    fn spec(&self) -> &Self::Spec;
    fn spec_mut(&mut self) -> &mut Self::Spec;

    /// Rules outside the spec, checked on create only
    fn check_create(&self) -> ErrorList {
        ErrorList::new()
    }
}

/// Default `object` in place and validate it as a new resource.
///
/// Returns the admission warnings.
pub fn admit_create<K: AdmissionObject>(
    registry: &Registry,
    namespace: Option<&str>,
    object: &mut K,
) -> Result<Vec<String>> {
    default_spec(registry, namespace, object);
    let mut errors = validate_spec(registry, object);
    errors.extend(object.check_create());
    errors.into_result()?;
    Ok(warnings(object))
}

/// Default `new` in place and validate it as a replacement of `old`
pub fn admit_update<K: AdmissionObject>(
    registry: &Registry,
    namespace: Option<&str>,
    old: &K,
    new: &mut K,
) -> Result<Vec<String>> {
    default_spec(registry, namespace, new);
    if K::SPEC_IMMUTABLE && old.spec() != new.spec() {
        return Err(AdmissionError::CannotUpdateChaos);
    }
    validate_spec(registry, new).into_result()?;
    Ok(warnings(new))
}

/// Deletion is never refused
pub fn admit_delete<K: AdmissionObject>(_object: Option<&K>) -> Result<()> {
    Ok(())
}

fn default_spec<K: AdmissionObject>(registry: &Registry, namespace: Option<&str>, object: &mut K) {
    let namespace = object.meta().namespace.clone().or_else(|| namespace.map(str::to_string));
    default_tree(registry, namespace.as_deref(), object.spec_mut());
}

fn validate_spec<K: AdmissionObject>(registry: &Registry, object: &K) -> ErrorList {
    let spec = object.spec();
    validate_tree(registry, spec, &FieldPath::new("spec"), spec)
}

fn warnings<K: AdmissionObject>(object: &K) -> Vec<String> {
    if is_paused(object.meta()) {
        vec![PAUSED_WARNING.to_string()]
    } else {
        Vec::new()
    }
}

/// Raw admission input for one object
#[derive(Debug, Clone)]
pub struct ReviewInput<'a> {
    pub operation: Operation,
    /// Namespace of the request, used when the object carries none
    pub namespace: Option<&'a str>,
    pub object: Option<Value>,
    pub old_object: Option<Value>,
}

/// Outcome of an allowed request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    pub warnings: Vec<String>,
    /// JSON patch replacing `/spec`, when defaulting changed it
    pub patch: Option<Value>,
}

type ReviewFn = fn(&Registry, ReviewInput<'_>) -> Result<Decision>;

/// Admission entry points of one kind
#[derive(Clone, Copy)]
pub struct KindEntry {
    pub kind: &'static str,
    pub spec_immutable: bool,
    review: ReviewFn,
}

impl KindEntry {
    pub fn of<K: AdmissionObject>(kind: &'static str) -> Self {
        Self {
            kind,
            spec_immutable: K::SPEC_IMMUTABLE,
            review: review::<K>,
        }
    }

    pub fn review(&self, registry: &Registry, input: ReviewInput<'_>) -> Result<Decision> {
        (self.review)(registry, input)
    }
}

impl Debug for KindEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindEntry")
            .field("kind", &self.kind)
            .field("spec_immutable", &self.spec_immutable)
            .finish()
    }
}

fn decode<K: AdmissionObject>(value: Option<Value>, operation: &'static str) -> Result<K> {
    let value = value.ok_or(AdmissionError::MissingObject(operation))?;
    Ok(serde_json::from_value(value)?)
}

fn review<K: AdmissionObject>(registry: &Registry, input: ReviewInput<'_>) -> Result<Decision> {
    match input.operation {
        Operation::Create => {
            let mut object: K = decode(input.object, "CREATE")?;
            let before = serde_json::to_value(object.spec())?;
            let warnings = admit_create(registry, input.namespace, &mut object)?;
            finish(&object, before, warnings)
        }
        Operation::Update => {
            let mut object: K = decode(input.object, "UPDATE")?;
            let old: K = decode(input.old_object, "UPDATE")?;
            let before = serde_json::to_value(object.spec())?;
            let warnings = admit_update(registry, input.namespace, &old, &mut object)?;
            finish(&object, before, warnings)
        }
        Operation::Delete | Operation::Connect => {
            let old = input
                .old_object
                .map(serde_json::from_value::<K>)
                .transpose()
                .ok()
                .flatten();
            admit_delete(old.as_ref())?;
            Ok(Decision::default())
        }
    }
}

fn finish<K: AdmissionObject>(object: &K, before: Value, warnings: Vec<String>) -> Result<Decision> {
    let after = serde_json::to_value(object.spec())?;
    let patch = (after != before).then(|| json!([{"op": "add", "path": "/spec", "value": after}]));
    Ok(Decision { warnings, patch })
}

impl AdmissionObject for Schedule {
    type Spec = ScheduleSpec;

    fn spec(&self) -> &ScheduleSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut ScheduleSpec {
        &mut self.spec
    }
}

impl AdmissionObject for Workflow {
    type Spec = WorkflowSpec;

    fn spec(&self) -> &WorkflowSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut WorkflowSpec {
        &mut self.spec
    }

    fn check_create(&self) -> ErrorList {
        self.reserved_status_errors()
    }
}

impl AdmissionObject for StatusCheck {
    type Spec = StatusCheckSpec;

    fn spec(&self) -> &StatusCheckSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut StatusCheckSpec {
        &mut self.spec
    }
}

/// Every admitted kind
pub fn kinds() -> Vec<KindEntry> {
    let mut kinds = chaos_kind_entries();
    kinds.push(KindEntry::of::<Schedule>("Schedule"));
    kinds.push(KindEntry::of::<Workflow>("Workflow"));
    kinds.push(KindEntry::of::<StatusCheck>("StatusCheck"));
    kinds
}

/// Kind table bound to a tag registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: &'static Registry,
    kinds: BTreeMap<&'static str, KindEntry>,
}

impl Dispatcher {
    pub fn new(registry: &'static Registry) -> Self {
        Self {
            registry,
            kinds: kinds().into_iter().map(|k| (k.kind, k)).collect(),
        }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub fn kind(&self, name: &str) -> Option<&KindEntry> {
        self.kinds.get(name)
    }

    pub fn kind_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    pub fn review(&self, kind: &str, input: ReviewInput<'_>) -> Result<Decision> {
        let entry = self
            .kind(kind)
            .ok_or_else(|| AdmissionError::UnknownKind(kind.to_string()))?;
        entry.review(self.registry, input)
    }
}
