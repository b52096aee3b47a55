// crates/rule-gate-core/src/core/predicate.rs
// ============================================================================
// Module: Field Predicates
// Description: Leaf predicates over named fields and the readers they evaluate against.
// Purpose: Plug rule and gate comparisons into the rule-logic requirement tree.
// Dependencies: crate::core::{identifiers, value}, rule-logic, serde, thiserror
// ============================================================================

//! ## Overview
//! Rule predicates and gate conditions are `Requirement<FieldPredicate>`
//! trees. A leaf either tests a boolean field (`verified`) or compares a field
//! against a literal (`role == "admin"`, `check_access >= 50`). Leaves read
//! values through [`FieldSource`], which both input records and the execution
//! context implement.
//!
//! Evaluation fails closed: a missing field, or a value whose kind does not
//! match the literal, makes the leaf false. Definition-time type checks keep
//! well-formed tables from ever reaching that path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rule_logic::AtomResolver;
use rule_logic::Comparator;
use rule_logic::DslError;
use rule_logic::Literal;
use rule_logic::PredicateEval;
use rule_logic::Requirement;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::FieldName;
use crate::core::identifiers::is_identifier;
use crate::core::value::Value;
use crate::core::value::ValueType;

// ============================================================================
// SECTION: Field Paths
// ============================================================================

/// Dotted path to a field, such as `zone` or `check_access.level`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    /// First segment.
    head: FieldName,
    /// Remaining segments.
    rest: Vec<FieldName>,
}

/// A string could not be read as a field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field path `{0}`")]
pub struct InvalidFieldPath(pub String);

impl FieldPath {
    /// Creates a single-segment path.
    #[must_use]
    pub fn field(name: impl Into<FieldName>) -> Self {
        Self {
            head: name.into(),
            rest: Vec::new(),
        }
    }

    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFieldPath`] when a segment is not an identifier.
    pub fn parse(text: &str) -> Result<Self, InvalidFieldPath> {
        let invalid = || InvalidFieldPath(text.to_string());
        let mut segments = text.split('.').map(|segment| {
            if is_identifier(segment) { Ok(FieldName::new(segment)) } else { Err(invalid()) }
        });
        let head = segments.next().ok_or_else(invalid)??;
        let rest = segments.collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            head,
            rest,
        })
    }

    /// Returns the first segment.
    #[must_use]
    pub const fn head(&self) -> &FieldName {
        &self.head
    }

    /// Returns the segments after the first.
    #[must_use]
    pub fn rest(&self) -> &[FieldName] {
        &self.rest
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for segment in &self.rest {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = InvalidFieldPath;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = InvalidFieldPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Field Sources
// ============================================================================

/// Anything predicates can read field values from.
pub trait FieldSource {
    /// Returns the value at `path`, or `None` when it does not exist.
    fn lookup(&self, path: &FieldPath) -> Option<&Value>;
}

impl FieldSource for crate::core::value::Record {
    fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path.head().as_str())?.get_path(path.rest())
    }
}

/// Reader handed to [`FieldPredicate`] during requirement evaluation.
#[derive(Clone, Copy)]
pub struct FieldReader<'a> {
    /// Underlying field source.
    source: &'a dyn FieldSource,
}

impl<'a> FieldReader<'a> {
    /// Wraps a field source.
    #[must_use]
    pub const fn new(source: &'a dyn FieldSource) -> Self {
        Self {
            source,
        }
    }

    /// Looks up a value through the wrapped source.
    #[must_use]
    pub fn lookup(&self, path: &FieldPath) -> Option<&'a Value> {
        self.source.lookup(path)
    }
}

// ============================================================================
// SECTION: Field Predicates
// ============================================================================

/// Leaf predicate over one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPredicate {
    /// True when the field holds boolean `true`.
    Truthy(FieldPath),
    /// Compares the field against a literal.
    Compare {
        /// Field being compared.
        path: FieldPath,
        /// Comparison operator.
        comparator: Comparator,
        /// Right-hand side literal.
        literal: Literal,
    },
}

impl FieldPredicate {
    /// Returns the path this predicate reads.
    #[must_use]
    pub const fn path(&self) -> &FieldPath {
        match self {
            Self::Truthy(path)
            | Self::Compare {
                path, ..
            } => path,
        }
    }

    /// Evaluates the predicate against a looked-up value.
    #[must_use]
    pub fn holds(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Self::Truthy(_) => matches!(value, Value::Bool(true)),
            Self::Compare {
                comparator,
                literal,
                ..
            } => compare(value, *comparator, literal),
        }
    }

    /// Checks that this predicate is meaningful for a field of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns a short reason when the field type and the predicate disagree.
    pub fn check_type(&self, ty: &ValueType) -> Result<(), &'static str> {
        match self {
            Self::Truthy(_) => match ty {
                ValueType::Bool => Ok(()),
                _ => Err("bare field references require a bool field"),
            },
            Self::Compare {
                comparator,
                literal,
                ..
            } => match literal {
                Literal::Int(_) | Literal::Float(_) => {
                    if ty.is_numeric() {
                        Ok(())
                    } else {
                        Err("numeric literal compared against a non-numeric field")
                    }
                }
                Literal::Bool(_) | Literal::Str(_) if comparator.is_ordering() => {
                    Err("ordering comparators require numeric operands")
                }
                Literal::Bool(_) => match ty {
                    ValueType::Bool => Ok(()),
                    _ => Err("bool literal compared against a non-bool field"),
                },
                Literal::Str(_) => match ty {
                    ValueType::Str => Ok(()),
                    _ => Err("string literal compared against a non-string field"),
                },
            },
        }
    }
}

impl PredicateEval for FieldPredicate {
    type Reader<'a> = FieldReader<'a>;

    fn eval(&self, reader: &Self::Reader<'_>) -> bool {
        self.holds(reader.lookup(self.path()))
    }
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truthy(path) => write!(f, "{path}"),
            Self::Compare {
                path,
                comparator,
                literal,
            } => write!(f, "{path} {comparator} {literal}"),
        }
    }
}

/// Compares a value against a literal; mismatched kinds never hold.
///
/// NaN is unordered: only `!=` holds against it.
fn compare(value: &Value, comparator: Comparator, literal: &Literal) -> bool {
    let ordering = match (value, literal) {
        (Value::Int(left), Literal::Int(right)) => Some(left.cmp(right)),
        (Value::Int(_) | Value::Float(_), Literal::Int(_) | Literal::Float(_)) => {
            let Some((left, right)) = value.as_f64().zip(literal.as_f64()) else {
                return false;
            };
            match left.partial_cmp(&right) {
                Some(ordering) => Some(ordering),
                None => return comparator == Comparator::NotEquals,
            }
        }
        (Value::Bool(left), Literal::Bool(right)) if !comparator.is_ordering() => {
            Some(left.cmp(right))
        }
        (Value::Str(left), Literal::Str(right)) if !comparator.is_ordering() => {
            Some(left.as_str().cmp(right.as_str()))
        }
        _ => None,
    };
    ordering.is_some_and(|ordering: Ordering| comparator.holds(ordering))
}

// ============================================================================
// SECTION: Condition Parsing
// ============================================================================

/// DSL resolver that turns any well-formed path into a field predicate.
///
/// Whether the path exists is checked later, against the declared shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPredicateResolver;

impl AtomResolver<FieldPredicate> for FieldPredicateResolver {
    fn resolve_field(&self, path: &str) -> Option<FieldPredicate> {
        FieldPath::parse(path).ok().map(FieldPredicate::Truthy)
    }

    fn resolve_comparison(
        &self,
        path: &str,
        comparator: Comparator,
        literal: Literal,
    ) -> Option<FieldPredicate> {
        FieldPath::parse(path).ok().map(|path| FieldPredicate::Compare {
            path,
            comparator,
            literal,
        })
    }
}

/// Parses predicate text such as `role == "member" && verified`.
///
/// # Errors
///
/// Returns [`DslError`] when the text is not a valid condition.
pub fn parse_condition(text: &str) -> Result<Requirement<FieldPredicate>, DslError> {
    rule_logic::parse_requirement(text, &FieldPredicateResolver)
}
