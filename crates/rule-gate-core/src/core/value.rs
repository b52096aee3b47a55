// crates/rule-gate-core/src/core/value.rs
// ============================================================================
// Module: Rule Gate Values
// Description: Typed values, records, and record shapes.
// Purpose: Give table inputs, step results, and outputs one typed representation.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Value`] is a JSON-compatible scalar or record. A [`RecordShape`]
//! declares the named, typed fields a record must carry; shapes are checked
//! before any rule runs so predicates never see ill-typed input.
//!
//! `Float` fields accept `Int` values. Nothing else converts implicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::FieldName;

// ============================================================================
// SECTION: Values
// ============================================================================

/// Runtime value flowing through tables and orchestrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Nested record value.
    Record(Record),
}

impl Value {
    /// Returns a short name for the value's kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Record(_) => "record",
        }
    }

    /// Returns the value as `f64` when it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Integers widen to f64 for arithmetic.")]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Bool(_) | Self::Str(_) | Self::Record(_) => None,
        }
    }

    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the record payload, if any.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Follows `path` through nested records. An empty path returns `self`.
    #[must_use]
    pub fn get_path(&self, path: &[FieldName]) -> Option<&Self> {
        match path {
            [] => Some(self),
            _ => self.as_record()?.get_path(path),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{value:.1}")
                } else {
                    write!(f, "{value}")
                }
            }
            Self::Str(value) => {
                f.write_str("\"")?;
                for ch in value.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Ordered map from field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<FieldName, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a field and returns the record, for literal construction.
    #[must_use]
    pub fn with(mut self, name: impl Into<FieldName>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, name: impl Into<FieldName>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Follows `path` through nested records.
    #[must_use]
    pub fn get_path(&self, path: &[FieldName]) -> Option<&Value> {
        let (head, rest) = path.split_first()?;
        self.get(head.as_str())?.get_path(rest)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.0.iter()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<FieldName>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
    }
}

// ============================================================================
// SECTION: Types and Shapes
// ============================================================================

/// Declared type of a field, a table output, or a step result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point; also accepts integers.
    Float,
    /// String.
    Str,
    /// Record with a fixed shape.
    Record(RecordShape),
}

impl ValueType {
    /// Infers the type of a concrete value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) => Self::Str,
            Value::Record(record) => Self::Record(
                record.iter().fold(RecordShape::new(), |shape, (name, value)| {
                    shape.field(name.clone(), Self::of(value))
                }),
            ),
        }
    }

    /// Returns true for `Int` and `Float`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Returns true for every type except records.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Record(_))
    }

    /// Returns true when a value of type `source` may be stored where `self` is declared.
    #[must_use]
    pub fn accepts_type(&self, source: &Self) -> bool {
        match (self, source) {
            (Self::Float, Self::Int | Self::Float)
            | (Self::Bool, Self::Bool)
            | (Self::Int, Self::Int)
            | (Self::Str, Self::Str) => true,
            (Self::Record(target), Self::Record(source)) => {
                target.len() == source.len()
                    && target.fields().iter().all(|field| {
                        source.field_type(field.name.as_str()).is_some_and(|ty| field.ty.accepts_type(ty))
                    })
            }
            _ => false,
        }
    }

    /// Returns true when `value` conforms to this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Record(shape), Value::Record(record)) => shape.check(record).is_ok(),
            _ => self.accepts_type(&Self::of(value)),
        }
    }

    /// Widens integers stored under `Float` declarations, recursively.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Integers widen to f64 under float fields.")]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Float, Value::Int(int)) => Value::Float(int as f64),
            (Self::Record(shape), Value::Record(record)) => Value::Record(
                record
                    .0
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match shape.field_type(name.as_str()) {
                            Some(ty) => ty.coerce(value),
                            None => value,
                        };
                        (name, value)
                    })
                    .collect(),
            ),
            (_, value) => value,
        }
    }

    /// Returns the first structural defect of a record type; scalars have none.
    #[must_use]
    pub fn defect(&self) -> Option<ShapeDefect> {
        match self {
            Self::Record(shape) => shape.defect(),
            Self::Bool | Self::Int | Self::Float | Self::Str => None,
        }
    }

    /// Resolves the type found at `path` inside this type.
    #[must_use]
    pub fn resolve_path(&self, path: &[FieldName]) -> Option<&Self> {
        match path {
            [] => Some(self),
            [head, rest @ ..] => match self {
                Self::Record(shape) => shape.field_type(head.as_str())?.resolve_path(rest),
                _ => None,
            },
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Record(shape) => write!(f, "record{shape}"),
        }
    }
}

/// One named, typed field of a record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: FieldName,
    /// Declared field type.
    #[serde(rename = "type")]
    pub ty: ValueType,
}

/// Declared fields of a record, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordShape {
    /// Field declarations in order.
    fields: Vec<FieldSpec>,
}

impl RecordShape {
    /// Creates an empty shape.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
        }
    }

    /// Appends a field declaration and returns the shape.
    #[must_use]
    pub fn field(mut self, name: impl Into<FieldName>, ty: ValueType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
        });
        self
    }

    /// Returns the field declarations in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the declared type of a field.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<&ValueType> {
        self.fields.iter().find(|field| field.name.as_str() == name).map(|field| &field.ty)
    }

    /// Returns the first structural defect in this shape or any nested shape.
    ///
    /// Fields are visited in declaration order, depth first.
    #[must_use]
    pub fn defect(&self) -> Option<ShapeDefect> {
        self.fields.iter().enumerate().find_map(|(index, field)| {
            if !field.name.is_identifier() {
                return Some(ShapeDefect::InvalidFieldName(field.name.to_string()));
            }
            if self.fields[.. index].iter().any(|earlier| earlier.name == field.name) {
                return Some(ShapeDefect::DuplicateField(field.name.to_string()));
            }
            field.ty.defect().map(|inner| inner.nested_under(&field.name))
        })
    }

    /// Checks that `record` carries exactly the declared fields with conforming values.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] for the first missing, unexpected, or ill-typed field.
    pub fn check(&self, record: &Record) -> Result<(), InputError> {
        self.check_at(record, "")
    }

    /// Checks a record whose fields are reported under `prefix`.
    fn check_at(&self, record: &Record, prefix: &str) -> Result<(), InputError> {
        let qualify = |name: &FieldName| {
            if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
        };
        for field in &self.fields {
            let Some(value) = record.get(field.name.as_str()) else {
                return Err(InputError::MissingField {
                    field: qualify(&field.name),
                });
            };
            match (&field.ty, value) {
                (ValueType::Record(shape), Value::Record(nested)) => {
                    shape.check_at(nested, &qualify(&field.name))?;
                }
                (ty, value) if ty.accepts(value) => {}
                (ty, value) => {
                    return Err(InputError::TypeMismatch {
                        field: qualify(&field.name),
                        expected: ty.to_string(),
                        found: value.kind(),
                    });
                }
            }
        }
        if let Some((name, _)) = record.iter().find(|(name, _)| self.field_type(name.as_str()).is_none()) {
            return Err(InputError::UnexpectedField {
                field: qualify(name),
            });
        }
        Ok(())
    }
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.ty)?;
        }
        f.write_str("}")
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural defect in a declared record shape. Paths are dotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeDefect {
    /// One record declares this field more than once.
    DuplicateField(String),
    /// This field name is not a condition identifier.
    InvalidFieldName(String),
}

impl ShapeDefect {
    /// Prefixes the reported path with the enclosing field.
    fn nested_under(self, parent: &FieldName) -> Self {
        match self {
            Self::DuplicateField(path) => Self::DuplicateField(format!("{parent}.{path}")),
            Self::InvalidFieldName(path) => Self::InvalidFieldName(format!("{parent}.{path}")),
        }
    }
}

/// A record does not satisfy a declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A declared field is absent.
    #[error("missing field `{field}`")]
    MissingField {
        /// Dotted field path.
        field: String,
    },
    /// The record carries a field the shape does not declare.
    #[error("unexpected field `{field}`")]
    UnexpectedField {
        /// Dotted field path.
        field: String,
    },
    /// A field value has the wrong type.
    #[error("field `{field}` expected {expected}, found {found}")]
    TypeMismatch {
        /// Dotted field path.
        field: String,
        /// Declared type.
        expected: String,
        /// Kind of the supplied value.
        found: &'static str,
    },
}
