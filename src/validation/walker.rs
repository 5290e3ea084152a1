//! Structural walker driving defaulting and validation
//!
//! Every spec type implements [`Walk`], usually through [`walk_fields!`](crate::walk_fields),
//! which lists the fields in declaration order with their JSON name and how
//! to treat them:
//!
//! - `nested`: descend with the JSON name appended to the path
//! - `inline`: descend without extending the path (flattened structs)
//! - `leaf(Tag)`, `leaf(Tag, default = "...")`, `leaf(Tag, nilable)`: resolve
//!   the tag in the registry and run its hooks
//!
//! A struct may also name a `check` function (cross-field rules, run after
//! its fields) and a `defaults` function (run before its fields default).
//! Containers recurse with `[i]` for sequence indices and `[key]` for map
//! keys. Errors are collected, never short-circuited.

use std::collections::BTreeMap;

use serde_json::Value;

use super::field::{ErrorList, FieldError, FieldPath};
use super::registry::{Registry, Tag, ValueType};

/// Root object seen by leaf hooks
pub trait Root {
    /// Selected action, for action-conditional rules
    fn action(&self) -> Option<&str> {
        None
    }
}

/// Root for walks over values without an action
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAction;

impl Root for NoAction {}

/// Read view of a tagged leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafValue<'a> {
    Text(Option<&'a str>),
    Integer(Option<i64>),
    Byte(u8),
    TextList(Option<&'a [String]>),
}

impl LeafValue<'_> {
    pub fn value_type(&self) -> ValueType {
        match self {
            LeafValue::Text(_) => ValueType::Text,
            LeafValue::Integer(_) => ValueType::Integer,
            LeafValue::Byte(_) => ValueType::Byte,
            LeafValue::TextList(_) => ValueType::TextList,
        }
    }

    /// Absent (not merely empty)
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            LeafValue::Text(None) | LeafValue::Integer(None) | LeafValue::TextList(None)
        )
    }

    /// Absent, empty string or empty list
    pub fn is_empty(&self) -> bool {
        match self {
            LeafValue::Text(v) => v.is_none_or(str::is_empty),
            LeafValue::Integer(v) => v.is_none(),
            LeafValue::Byte(_) => false,
            LeafValue::TextList(v) => v.is_none_or(<[String]>::is_empty),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LeafValue::Text(v) => v.map_or(Value::Null, Value::from),
            LeafValue::Integer(v) => v.map_or(Value::Null, Value::from),
            LeafValue::Byte(v) => Value::from(*v),
            LeafValue::TextList(v) => v.map_or(Value::Null, |list| Value::from(list.to_vec())),
        }
    }
}

/// Write access to a tagged leaf, for defaulters
#[derive(Debug)]
pub enum LeafSlot<'a> {
    Text(&'a mut String),
    OptText(&'a mut Option<String>),
    Byte(&'a mut u8),
    /// A leaf defaulters cannot write
    Fixed(ValueType),
}

impl LeafSlot<'_> {
    pub fn value_type(&self) -> ValueType {
        match self {
            LeafSlot::Text(_) | LeafSlot::OptText(_) => ValueType::Text,
            LeafSlot::Byte(_) => ValueType::Byte,
            LeafSlot::Fixed(t) => *t,
        }
    }
}

/// Field types that can carry a tag
pub trait AsLeaf {
    fn leaf(&self) -> LeafValue<'_>;
    fn leaf_mut(&mut self) -> LeafSlot<'_>;
}

impl AsLeaf for String {
    fn leaf(&self) -> LeafValue<'_> {
        LeafValue::Text(Some(self.as_str()))
    }

    fn leaf_mut(&mut self) -> LeafSlot<'_> {
        LeafSlot::Text(self)
    }
}

impl AsLeaf for Option<String> {
    fn leaf(&self) -> LeafValue<'_> {
        LeafValue::Text(self.as_deref())
    }

    fn leaf_mut(&mut self) -> LeafSlot<'_> {
        LeafSlot::OptText(self)
    }
}

impl AsLeaf for u8 {
    fn leaf(&self) -> LeafValue<'_> {
        LeafValue::Byte(*self)
    }

    fn leaf_mut(&mut self) -> LeafSlot<'_> {
        LeafSlot::Byte(self)
    }
}

macro_rules! integer_leaf {
    ($($t:ty),*) => {
        $(
            impl AsLeaf for $t {
                fn leaf(&self) -> LeafValue<'_> {
                    LeafValue::Integer(Some(i64::from(*self)))
                }

                fn leaf_mut(&mut self) -> LeafSlot<'_> {
                    LeafSlot::Fixed(ValueType::Integer)
                }
            }

            impl AsLeaf for Option<$t> {
                fn leaf(&self) -> LeafValue<'_> {
                    LeafValue::Integer(self.map(i64::from))
                }

                fn leaf_mut(&mut self) -> LeafSlot<'_> {
                    LeafSlot::Fixed(ValueType::Integer)
                }
            }
        )*
    };
}

integer_leaf!(i32, u32, i64);

impl AsLeaf for Vec<String> {
    fn leaf(&self) -> LeafValue<'_> {
        LeafValue::TextList(Some(self.as_slice()))
    }

    fn leaf_mut(&mut self) -> LeafSlot<'_> {
        LeafSlot::Fixed(ValueType::TextList)
    }
}

impl AsLeaf for Option<Vec<String>> {
    fn leaf(&self) -> LeafValue<'_> {
        LeafValue::TextList(self.as_deref())
    }

    fn leaf_mut(&mut self) -> LeafSlot<'_> {
        LeafSlot::Fixed(ValueType::TextList)
    }
}

/// Per-field annotations besides the tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAttrs {
    /// Literal used by defaulters when the field is empty
    pub default: Option<&'static str>,
    /// An absent value skips validation
    pub nilable: bool,
}

impl FieldAttrs {
    pub const NONE: FieldAttrs = FieldAttrs {
        default: None,
        nilable: false,
    };

    pub const NILABLE: FieldAttrs = FieldAttrs {
        default: None,
        nilable: true,
    };

    pub const fn with_default(value: &'static str) -> Self {
        FieldAttrs {
            default: Some(value),
            nilable: false,
        }
    }
}

/// Object-level facts available to defaulters
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContext<'a> {
    /// Namespace of the object being admitted
    pub namespace: Option<&'a str>,
}

/// A type the walker can traverse
pub trait Walk {
    /// Collect validation errors for `self` located at `path`
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>);

    /// Fill omitted fields in place
    fn default_fields(&mut self, d: &Defaulter<'_>);
}

/// Validation pass state
pub struct Validator<'a> {
    registry: &'a Registry,
    root: &'a dyn Root,
    errors: ErrorList,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry, root: &'a dyn Root) -> Self {
        Self {
            registry,
            root,
            errors: ErrorList::new(),
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn root(&self) -> &'a dyn Root {
        self.root
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.errors.extend(errors);
    }

    /// Validate a tagged leaf
    pub fn leaf<L: AsLeaf + ?Sized>(
        &mut self,
        path: &FieldPath,
        tag: Tag,
        attrs: FieldAttrs,
        value: &L,
    ) {
        let Some(entry) = self.registry.get(tag.name()) else {
            return;
        };
        let leaf = value.leaf();
        if leaf.value_type() != entry.value_type {
            self.errors.push(FieldError::internal(
                path.clone(),
                format!(
                    "field tagged {} holds a {:?} value, expected {:?}",
                    tag.name(),
                    leaf.value_type(),
                    entry.value_type
                ),
            ));
            return;
        }
        if attrs.nilable && leaf.is_nil() {
            return;
        }
        if let Some(validate) = entry.hooks.validate {
            self.errors.extend(validate(leaf, self.root, path));
        }
    }

    /// Validate `value` with a different root, e.g. a chaos spec embedded in
    /// a schedule or workflow template
    pub fn with_root(&mut self, root: &dyn Root, f: impl FnOnce(&mut Validator<'_>)) {
        let mut nested = Validator {
            registry: self.registry,
            root,
            errors: ErrorList::new(),
        };
        f(&mut nested);
        self.errors.extend(nested.errors);
    }

    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorList {
        self.errors
    }
}

/// Defaulting pass state
pub struct Defaulter<'a> {
    registry: &'a Registry,
    context: DefaultContext<'a>,
}

impl<'a> Defaulter<'a> {
    pub fn new(registry: &'a Registry, namespace: Option<&'a str>) -> Self {
        Self {
            registry,
            context: DefaultContext { namespace },
        }
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.context.namespace
    }

    /// Run the tag's defaulter on a leaf
    pub fn leaf<L: AsLeaf + ?Sized>(&self, tag: Tag, attrs: FieldAttrs, value: &mut L) {
        let Some(entry) = self.registry.get(tag.name()) else {
            return;
        };
        let Some(default) = entry.hooks.default else {
            return;
        };
        let slot = value.leaf_mut();
        // Type mismatches surface as validation errors.
        if slot.value_type() != entry.value_type {
            return;
        }
        default(slot, &self.context, &attrs);
    }
}

/// Run the defaulting pass over `value`
pub fn default_tree<W: Walk + ?Sized>(registry: &Registry, namespace: Option<&str>, value: &mut W) {
    let defaulter = Defaulter::new(registry, namespace);
    value.default_fields(&defaulter);
}

/// Run the validation pass over `value`, rooted at `path`
pub fn validate_tree<W: Walk + ?Sized>(
    registry: &Registry,
    root: &dyn Root,
    path: &FieldPath,
    value: &W,
) -> ErrorList {
    let mut validator = Validator::new(registry, root);
    value.validate_fields(path, &mut validator);
    validator.into_errors()
}

impl<T: Walk> Walk for Option<T> {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        if let Some(inner) = self {
            inner.validate_fields(path, v);
        }
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        if let Some(inner) = self {
            inner.default_fields(d);
        }
    }
}

impl<T: Walk + ?Sized> Walk for Box<T> {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        (**self).validate_fields(path, v);
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        (**self).default_fields(d);
    }
}

impl<T: Walk> Walk for Vec<T> {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        for (i, item) in self.iter().enumerate() {
            item.validate_fields(&path.index(i), v);
        }
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        for item in self.iter_mut() {
            item.default_fields(d);
        }
    }
}

impl<T: Walk> Walk for BTreeMap<String, T> {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        for (key, item) in self {
            item.validate_fields(&path.key(key), v);
        }
    }

    fn default_fields(&mut self, d: &Defaulter<'_>) {
        for item in self.values_mut() {
            item.default_fields(d);
        }
    }
}

/// Implement [`Walk`] for a struct from a field table.
///
/// ```ignore
/// walk_fields! {
///     DelaySpec {
///         latency: "latency" => leaf(Duration),
///         jitter: "jitter" => leaf(Duration, default = "0ms"),
///         reorder: "reorder" => nested,
///     }
///     check = Self::check_reorder;
/// }
/// ```
#[macro_export]
#[doc(hidden)]
macro_rules! walk_fields {
    (@validate $value:expr, $path:ident, $v:ident, $json:literal, nested) => {
        $crate::validation::Walk::validate_fields(&$value, &$path.child($json), $v)
    };
    (@validate $value:expr, $path:ident, $v:ident, $json:literal, inline) => {
        $crate::validation::Walk::validate_fields(&$value, $path, $v)
    };
    (@validate $value:expr, $path:ident, $v:ident, $json:literal, leaf($tag:ident $(, $($attr:tt)*)?)) => {
        $v.leaf(
            &$path.child($json),
            $crate::validation::Tag::$tag,
            $crate::walk_fields!(@attrs $($($attr)*)?),
            &$value,
        )
    };

    (@default $value:expr, $d:ident, nested) => {
        $crate::validation::Walk::default_fields(&mut $value, $d)
    };
    (@default $value:expr, $d:ident, inline) => {
        $crate::validation::Walk::default_fields(&mut $value, $d)
    };
    (@default $value:expr, $d:ident, leaf($tag:ident $(, $($attr:tt)*)?)) => {
        $d.leaf(
            $crate::validation::Tag::$tag,
            $crate::walk_fields!(@attrs $($($attr)*)?),
            &mut $value,
        )
    };

    (@attrs) => { $crate::validation::FieldAttrs::NONE };
    (@attrs default = $value:literal) => { $crate::validation::FieldAttrs::with_default($value) };
    (@attrs nilable) => { $crate::validation::FieldAttrs::NILABLE };

    (
        $ty:ty {
            $( $field:ident : $json:literal => $how:ident $( ( $($arg:tt)* ) )? ),* $(,)?
        }
        $( check = $check:path ; )?
        $( defaults = $defaults:path ; )?
    ) => {
        impl $crate::validation::Walk for $ty {
            #[allow(unused_variables)]
            fn validate_fields(
                &self,
                path: &$crate::validation::FieldPath,
                v: &mut $crate::validation::Validator<'_>,
            ) {
                $( $crate::walk_fields!(@validate self.$field, path, v, $json, $how $( ( $($arg)* ) )?); )*
                $( $check(self, path, v); )?
            }

            #[allow(unused_variables)]
            fn default_fields(&mut self, d: &$crate::validation::Defaulter<'_>) {
                $( $defaults(self, d); )?
                $( $crate::walk_fields!(@default self.$field, d, $how $( ( $($arg)* ) )?); )*
            }
        }
    };
}
