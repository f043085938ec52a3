//! Argument and function signature specifications.
//!
//! The decorator boundary (an external collaborator, typically a code
//! generator or a hand-written adapter) supplies one [`FunctionSig`] per
//! wrapped function. The core takes these as pure data and performs no
//! reflection of its own.

use crate::section::Category;
use crate::value::ConfigValue;
use std::sync::Arc;

/// How a parameter behaves when the caller does not bind it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultMarker {
    /// No default and no marker: the parameter is skipped and left for the
    /// callee to complain about if it ends up unbound.
    NoDefault,
    /// A plain literal default: resolution is attempted, the default is kept
    /// on a miss.
    Literal(ConfigValue),
    /// Resolution must succeed across the full provider stack.
    ConfigRequired,
    /// Resolution must succeed and only secure providers are consulted.
    SecretRequired,
}

/// The declared shape of an argument's value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Bool,
    Sequence(Box<ValueKind>),
    Record(Arc<RecordShape>),
}

impl ValueKind {
    /// Human-readable name used in type errors.
    pub fn describe(&self) -> String {
        match self {
            ValueKind::Text => "text".to_string(),
            ValueKind::Integer => "integer".to_string(),
            ValueKind::Float => "float".to_string(),
            ValueKind::Bool => "bool".to_string(),
            ValueKind::Sequence(inner) => format!("sequence of {}", inner.describe()),
            ValueKind::Record(shape) => shape.name.clone(),
        }
    }
}

/// One accepted raw-value shape for a structured type.
///
/// Alternatives are tried in declared order, but their match domains are
/// disjoint: `Opaque` only ever matches a raw string, `Structured` only a
/// mapping (or field-by-field provider lookups), `Ambient` only the complete
/// absence of provider values. Declared order therefore never has to break a
/// tie between two alternatives claiming the same raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    /// A single opaque string, e.g. a connection string or a serialized
    /// service-account blob. Stored into the shape's `opaque_field`.
    Opaque,
    /// A full structured mapping, built field by field with nested
    /// resolution for missing fields.
    Structured,
    /// Derive the whole value from the shape's field defaults, the ambient
    /// credentials case. Matches only when every required field carries a
    /// default.
    Ambient,
}

/// A structured, credential-like record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    /// Shape name used in error messages, e.g. `"postgres credentials"`.
    pub name: String,
    pub fields: Vec<FieldSpec>,
    /// Accepted raw representations, in priority order. An empty list means
    /// `Structured` only.
    pub alternatives: Vec<Alternative>,
    /// Where an opaque native value lands; required for [`Alternative::Opaque`].
    pub opaque_field: Option<String>,
    /// Credential-like shapes are secret as a whole: plain providers are
    /// never consulted for them or their fields.
    pub secret: bool,
}

impl RecordShape {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn alternatives(&self) -> &[Alternative] {
        if self.alternatives.is_empty() {
            &[Alternative::Structured]
        } else {
            &self.alternatives
        }
    }
}

/// One field of a [`RecordShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
    /// Field-level secret marker, e.g. `password` inside otherwise plain
    /// connection parameters.
    pub secret: bool,
    pub default: Option<ConfigValue>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            secret: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: ConfigValue) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }
}

/// One declared parameter of a wrapped function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ValueKind,
    pub marker: DefaultMarker,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind, marker: DefaultMarker) -> Self {
        Self {
            name: name.into(),
            kind,
            marker,
        }
    }

    pub(crate) fn is_secret(&self) -> bool {
        if matches!(self.marker, DefaultMarker::SecretRequired) {
            return true;
        }
        matches!(&self.kind, ValueKind::Record(shape) if shape.secret)
    }
}

/// The full signature of a wrapped function, as supplied by the decorator
/// boundary: identity for section-path construction plus the parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub module: String,
    pub function: String,
    pub category: Category,
    pub args: Vec<ArgumentSpec>,
}

impl FunctionSig {
    pub fn new(
        module: impl Into<String>,
        function: impl Into<String>,
        category: Category,
        args: Vec<ArgumentSpec>,
    ) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            category,
            args,
        }
    }
}
