//! Field paths and field-level errors
//!
//! Paths render the way the API server prints them (`spec.templates[0].name`,
//! `spec.selector.pods[default]`) and errors use the API server's field-error
//! wording, so aggregated admission messages read like built-in validation.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Child(String),
    Index(usize),
    Key(String),
}

/// Location of a field inside a resource, rooted at e.g. `spec`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Create a path with a single top-level segment
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![Segment::Child(root.to_string())],
        }
    }

    pub fn child(&self, name: &str) -> Self {
        self.with(Segment::Child(name.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(Segment::Index(index))
    }

    pub fn key(&self, key: &str) -> Self {
        self.with(Segment::Key(key.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Child(name) if i == 0 => write!(f, "{name}")?,
                Segment::Child(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Kind of a field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// The value is present but malformed or out of range
    Invalid,
    /// A required value is missing
    Required,
    /// The value is not one of an enumerated set
    NotSupported,
    /// The value clashes with another one that must be unique
    Duplicate,
    /// The field could not be checked at all
    Internal,
}

impl FieldErrorKind {
    fn label(self) -> &'static str {
        match self {
            FieldErrorKind::Invalid => "Invalid value",
            FieldErrorKind::Required => "Required value",
            FieldErrorKind::NotSupported => "Unsupported value",
            FieldErrorKind::Duplicate => "Duplicate value",
            FieldErrorKind::Internal => "Internal error",
        }
    }
}

/// A single validation failure bound to a field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub path: FieldPath,
    pub value: Option<Value>,
    pub detail: String,
    pub supported: Vec<String>,
}

impl FieldError {
    pub fn invalid(path: FieldPath, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            path,
            value: Some(value.into()),
            detail: detail.into(),
            supported: Vec::new(),
        }
    }

    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            path,
            value: None,
            detail: detail.into(),
            supported: Vec::new(),
        }
    }

    pub fn not_supported(path: FieldPath, value: impl Into<Value>, supported: &[&str]) -> Self {
        Self {
            kind: FieldErrorKind::NotSupported,
            path,
            value: Some(value.into()),
            detail: String::new(),
            supported: supported.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl Into<Value>) -> Self {
        Self {
            kind: FieldErrorKind::Duplicate,
            path,
            value: Some(value.into()),
            detail: String::new(),
            supported: Vec::new(),
        }
    }

    pub fn internal(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Internal,
            path,
            value: None,
            detail: detail.into(),
            supported: Vec::new(),
        }
    }

    /// Message without the path prefix
    pub fn message(&self) -> String {
        let mut out = self.kind.label().to_string();
        match self.kind {
            FieldErrorKind::Required | FieldErrorKind::Internal => {}
            _ => {
                if let Some(value) = &self.value {
                    out.push_str(": ");
                    out.push_str(&render_value(value));
                }
            }
        }
        if !self.supported.is_empty() {
            let quoted: Vec<String> = self.supported.iter().map(|s| format!("{s:?}")).collect();
            out.push_str(": supported values: ");
            out.push_str(&quoted.join(", "));
        }
        if !self.detail.is_empty() {
            out.push_str(": ");
            out.push_str(&self.detail);
        }
        out
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message())
    }
}

impl std::error::Error for FieldError {}

/// Ordered collection of field errors produced by one walk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// True when some error is reported at `path` (rendered form)
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path.to_string() == path)
    }

    /// `Ok(())` when empty
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Extend<FieldError> for ErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<FieldError> for ErrorList {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Aggregated form: the single message, or `[m1, m2, ...]` with duplicates dropped
impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = std::collections::HashSet::new();
        let messages: Vec<String> = self
            .0
            .iter()
            .map(ToString::to_string)
            .filter(|m| seen.insert(m.clone()))
            .collect();
        match messages.as_slice() {
            [] => Ok(()),
            [only] => f.write_str(only),
            many => write!(f, "[{}]", many.join(", ")),
        }
    }
}

impl std::error::Error for ErrorList {}
