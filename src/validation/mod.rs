//! Validation and defaulting engine
//!
//! Spec fields carry annotation tags ([`Tag`]). The [`Registry`] maps each tag
//! to the value type it accepts and to its validator/defaulter hooks; the
//! walker ([`Walk`]) traverses a spec, resolving tags against the registry and
//! collecting path-qualified [`FieldError`]s.
//!
//! Defaulting always runs over the whole tree before validation starts.

mod cron;
mod duration;
mod field;
pub mod leaf;
mod registry;
mod units;
mod walker;

pub use cron::{CronSchedule, parse_cron};
pub use duration::{DurationError, parse_duration};
pub use field::{ErrorList, FieldError, FieldErrorKind, FieldPath};
pub use leaf::DISK_ACTIONS;
pub use registry::{
    DefaultFn, Entry, Hooks, Registry, RegistryConflict, Tag, ValidateFn, ValueType, global, init,
};
pub use units::{check_percent, parse_byte_size, parse_rate, parse_status_code};
pub use walker::{
    AsLeaf, DefaultContext, Defaulter, FieldAttrs, LeafSlot, LeafValue, NoAction, Root, Validator,
    Walk, default_tree, validate_tree,
};
