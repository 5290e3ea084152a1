//! Field-annotation registry
//!
//! Maps a tag name to the value type the tagged field must hold and to the
//! validator/defaulter hooks the walker invokes for it. The process-wide
//! instance is built once by [`init`] before the admission server starts and
//! is read-only afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::field::{ErrorList, FieldPath};
use super::walker::{DefaultContext, FieldAttrs, LeafSlot, LeafValue, Root};

/// Annotation tags a spec field can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Duration,
    Percent,
    FloatStr,
    ProcessNum,
    DiskName,
    EbsVolume,
    AwsDeviceName,
    Lun,
    GcpDeviceNames,
    StatusCode,
    DiskAction,
    RateUnit,
    ByteSize,
}

impl Tag {
    pub const ALL: [Tag; 13] = [
        Tag::Duration,
        Tag::Percent,
        Tag::FloatStr,
        Tag::ProcessNum,
        Tag::DiskName,
        Tag::EbsVolume,
        Tag::AwsDeviceName,
        Tag::Lun,
        Tag::GcpDeviceNames,
        Tag::StatusCode,
        Tag::DiskAction,
        Tag::RateUnit,
        Tag::ByteSize,
    ];

    /// Registry key
    pub fn name(self) -> &'static str {
        match self {
            Tag::Duration => "Duration",
            Tag::Percent => "Percent",
            Tag::FloatStr => "FloatStr",
            Tag::ProcessNum => "ProcessNum",
            Tag::DiskName => "DiskName",
            Tag::EbsVolume => "EbsVolume",
            Tag::AwsDeviceName => "AwsDeviceName",
            Tag::Lun => "LUN",
            Tag::GcpDeviceNames => "GcpDeviceNames",
            Tag::StatusCode => "StatusCode",
            Tag::DiskAction => "DiskAction",
            Tag::RateUnit => "RateUnit",
            Tag::ByteSize => "ByteSize",
        }
    }
}

/// Shape of the value a tagged field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `String` or `Option<String>`
    Text,
    /// Signed or unsigned integer, optionally absent
    Integer,
    /// `u8`
    Byte,
    /// `Vec<String>`, optionally absent
    TextList,
}

pub type ValidateFn = fn(LeafValue<'_>, &dyn Root, &FieldPath) -> ErrorList;
pub type DefaultFn = fn(LeafSlot<'_>, &DefaultContext<'_>, &FieldAttrs);

/// Hook set of one tag
#[derive(Debug, Clone, Copy, Default)]
pub struct Hooks {
    pub validate: Option<ValidateFn>,
    pub default: Option<DefaultFn>,
}

impl Hooks {
    pub fn validate(f: ValidateFn) -> Self {
        Self {
            validate: Some(f),
            default: None,
        }
    }

    pub fn default_only(f: DefaultFn) -> Self {
        Self {
            validate: None,
            default: Some(f),
        }
    }

    pub fn both(validate: ValidateFn, default: DefaultFn) -> Self {
        Self {
            validate: Some(validate),
            default: Some(default),
        }
    }

    fn same_as(&self, other: &Hooks) -> bool {
        let validate = match (self.validate, other.validate) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::fn_addr_eq(a, b),
            _ => false,
        };
        let default = match (self.default, other.default) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::fn_addr_eq(a, b),
            _ => false,
        };
        validate && default
    }
}

/// Registered tag
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub value_type: ValueType,
    pub hooks: Hooks,
}

/// A tag was registered twice with different definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tag {name} is already registered with a different {conflict}")]
pub struct RegistryConflict {
    pub name: String,
    pub conflict: &'static str,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<&'static str, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin tag
    pub fn with_builtins() -> Result<Self, RegistryConflict> {
        let mut registry = Self::new();
        for (tag, value_type, hooks) in super::leaf::builtins() {
            registry.register(tag.name(), value_type, hooks)?;
        }
        Ok(registry)
    }

    /// Register a tag. Re-registering the same definition is a no-op.
    pub fn register(
        &mut self,
        name: &'static str,
        value_type: ValueType,
        hooks: Hooks,
    ) -> Result<(), RegistryConflict> {
        if let Some(existing) = self.entries.get(name) {
            if existing.value_type != value_type {
                return Err(RegistryConflict {
                    name: name.to_string(),
                    conflict: "value type",
                });
            }
            if !existing.hooks.same_as(&hooks) {
                return Err(RegistryConflict {
                    name: name.to_string(),
                    conflict: "hook set",
                });
            }
            return Ok(());
        }
        self.entries.insert(name, Entry { value_type, hooks });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Build the process-wide registry. Later calls return the same instance.
pub fn init() -> Result<&'static Registry, RegistryConflict> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let registry = Registry::with_builtins()?;
    Ok(GLOBAL.get_or_init(|| registry))
}

/// The process-wide registry, if [`init`] has run
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}
