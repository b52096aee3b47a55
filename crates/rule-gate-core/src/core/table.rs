// crates/rule-gate-core/src/core/table.rs
// ============================================================================
// Module: Decision Tables
// Description: Ordered, first-match-wins rule tables.
// Purpose: Validate table definitions eagerly and evaluate them against records.
// Dependencies: crate::core::{definition, identifiers, limits, predicate, value}, rule-logic, serde, thiserror
// ============================================================================

//! ## Overview
//! A decision table is an ordered list of `(when, then)` rules over one
//! declared input shape. Evaluation walks the rules in declaration order and
//! returns the first rule whose predicate holds. Overlapping predicates are
//! resolved by order alone. If no rule matches, evaluation fails with
//! [`NoRuleMatched`]; there is no implicit default. A final rule with
//! `when: true` is how a table declares an explicit fallback.
//!
//! Tables are pure: no caching, and every call starts again from rule 1.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rule_logic::Requirement;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::definition::DefinitionError;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::TableId;
use crate::core::limits::EngineLimits;
use crate::core::predicate::FieldPath;
use crate::core::predicate::FieldPredicate;
use crate::core::predicate::FieldReader;
use crate::core::value::InputError;
use crate::core::value::Record;
use crate::core::value::RecordShape;
use crate::core::value::Value;
use crate::core::value::ValueType;

// ============================================================================
// SECTION: Table Specification
// ============================================================================

/// Declarative decision table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTableSpec {
    /// Table identifier.
    pub table_id: TableId,
    /// Declared input shape.
    pub input: RecordShape,
    /// Declared scalar output type.
    pub output: ValueType,
    /// Rules in evaluation order.
    pub rules: Vec<RuleSpec>,
}

/// One `(when, then)` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule identifier, unique within the table.
    pub rule_id: RuleId,
    /// Predicate over input fields.
    pub when: Requirement<FieldPredicate>,
    /// Result produced when the predicate holds.
    pub then: RuleResult,
}

/// Result expression of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleResult {
    /// A fixed value.
    Literal(Value),
    /// `field * coefficient + offset`, computed in `f64`.
    Linear {
        /// Numeric input field.
        field: FieldPath,
        /// Multiplier applied to the field.
        coefficient: f64,
        /// Constant added after multiplication.
        offset: f64,
    },
}

// ============================================================================
// SECTION: Evaluation Results
// ============================================================================

/// Which rule matched and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMatch {
    /// Zero-based position of the matching rule.
    pub rule_index: usize,
    /// Identifier of the matching rule.
    pub rule_id: RuleId,
    /// Produced value.
    pub value: Value,
}

/// No rule in a table matched the input.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no rule matched in table `{table_id}` for input {input}")]
pub struct NoRuleMatched {
    /// Table that was exhausted.
    pub table_id: TableId,
    /// Input values that matched nothing.
    pub input: Record,
}

/// Decision table evaluation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// No table is registered under the identifier.
    #[error("unknown table identifier: {0}")]
    UnknownTable(TableId),
    /// The input record does not satisfy the table's input shape.
    #[error("invalid input for table `{table_id}`: {source}")]
    InvalidInput {
        /// Table being evaluated.
        table_id: TableId,
        /// Shape violation.
        source: InputError,
    },
    /// Rule list exhausted without a match.
    #[error(transparent)]
    NoRuleMatched(#[from] NoRuleMatched),
    /// A linear result could not read its numeric operand.
    #[error("rule `{rule_id}` in table `{table_id}` has no numeric value at `{field}`")]
    NonNumericOperand {
        /// Table being evaluated.
        table_id: TableId,
        /// Matching rule.
        rule_id: RuleId,
        /// Operand path.
        field: String,
    },
}

// ============================================================================
// SECTION: Decision Table
// ============================================================================

/// Validated, immutable decision table.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTable {
    /// Validated definition.
    spec: DecisionTableSpec,
}

impl DecisionTable {
    /// Validates a table definition with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when the definition is inconsistent.
    pub fn new(spec: DecisionTableSpec) -> Result<Self, DefinitionError> {
        Self::with_limits(spec, &EngineLimits::default())
    }

    /// Validates a table definition against explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when the definition is inconsistent.
    pub fn with_limits(spec: DecisionTableSpec, limits: &EngineLimits) -> Result<Self, DefinitionError> {
        let table = &spec.table_id;
        if spec.rules.is_empty() {
            return Err(DefinitionError::EmptyTable {
                table: table.clone(),
            });
        }
        if spec.rules.len() > limits.max_rules {
            return Err(DefinitionError::TooManyRules {
                table: table.clone(),
                count: spec.rules.len(),
                max: limits.max_rules,
            });
        }
        if let Some(defect) = spec.input.defect() {
            return Err(DefinitionError::shape(format!("table `{table}` input"), defect));
        }
        if !spec.output.is_scalar() {
            return Err(DefinitionError::OutputNotScalar {
                table: table.clone(),
            });
        }

        ensure_unique_rule_ids(&spec)?;
        for rule in &spec.rules {
            let owner = format!("rule `{}` in table `{table}`", rule.rule_id);
            limits
                .condition_validator()
                .validate(&rule.when)
                .map_err(|source| DefinitionError::ConditionTooComplex {
                    owner: owner.clone(),
                    source,
                })?;
            ensure_predicates_typed(&rule.when, &owner, |path| {
                spec.input.field_type(path.head().as_str())?.resolve_path(path.rest())
            })?;
            ensure_result_fits(&spec, rule)?;
        }

        Ok(Self {
            spec,
        })
    }

    /// Returns the table identifier.
    #[must_use]
    pub const fn table_id(&self) -> &TableId {
        &self.spec.table_id
    }

    /// Returns the validated definition.
    #[must_use]
    pub const fn spec(&self) -> &DecisionTableSpec {
        &self.spec
    }

    /// Returns the declared input shape.
    #[must_use]
    pub const fn input_shape(&self) -> &RecordShape {
        &self.spec.input
    }

    /// Returns the declared output type.
    #[must_use]
    pub const fn output_type(&self) -> &ValueType {
        &self.spec.output
    }

    /// Evaluates the table and returns the first matching rule's result.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::InvalidInput`] when the record does not fit
    /// the input shape and [`EvaluationError::NoRuleMatched`] when no rule holds.
    pub fn evaluate(&self, input: &Record) -> Result<Value, EvaluationError> {
        self.evaluate_traced(input).map(|matched| matched.value)
    }

    /// Evaluates the table and reports which rule matched.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTable::evaluate`].
    pub fn evaluate_traced(&self, input: &Record) -> Result<TableMatch, EvaluationError> {
        self.spec.input.check(input).map_err(|source| EvaluationError::InvalidInput {
            table_id: self.spec.table_id.clone(),
            source,
        })?;

        let reader = FieldReader::new(input);
        for (rule_index, rule) in self.spec.rules.iter().enumerate() {
            if !rule.when.eval(&reader) {
                continue;
            }
            let value = self.compute(rule, input)?;
            return Ok(TableMatch {
                rule_index,
                rule_id: rule.rule_id.clone(),
                value,
            });
        }

        Err(EvaluationError::NoRuleMatched(NoRuleMatched {
            table_id: self.spec.table_id.clone(),
            input: input.clone(),
        }))
    }

    /// Computes a matched rule's result.
    fn compute(&self, rule: &RuleSpec, input: &Record) -> Result<Value, EvaluationError> {
        match &rule.then {
            RuleResult::Literal(value) => Ok(self.spec.output.coerce(value.clone())),
            RuleResult::Linear {
                field,
                coefficient,
                offset,
            } => {
                let operand = input
                    .get(field.head().as_str())
                    .and_then(|value| value.get_path(field.rest()))
                    .and_then(Value::as_f64)
                    .ok_or_else(|| EvaluationError::NonNumericOperand {
                        table_id: self.spec.table_id.clone(),
                        rule_id: rule.rule_id.clone(),
                        field: field.to_string(),
                    })?;
                Ok(Value::Float(operand * coefficient + offset))
            }
        }
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures rule identifiers are unique within the table.
fn ensure_unique_rule_ids(spec: &DecisionTableSpec) -> Result<(), DefinitionError> {
    for (index, rule) in spec.rules.iter().enumerate() {
        if spec.rules.iter().skip(index + 1).any(|other| other.rule_id == rule.rule_id) {
            return Err(DefinitionError::DuplicateRuleId {
                table: spec.table_id.clone(),
                rule: rule.rule_id.clone(),
            });
        }
    }
    Ok(())
}

/// Ensures every leaf reads a resolvable path of a compatible type.
///
/// `resolve` maps a path to its declared type, or `None` when the path does
/// not exist. Shared with orchestration gate validation.
pub(crate) fn ensure_predicates_typed<'t, F>(
    condition: &Requirement<FieldPredicate>,
    owner: &str,
    resolve: F,
) -> Result<(), DefinitionError>
where
    F: Fn(&FieldPath) -> Option<&'t ValueType>,
{
    for predicate in condition.predicates() {
        let Some(ty) = resolve(predicate.path()) else {
            return Err(DefinitionError::UnknownPredicateField {
                owner: owner.to_string(),
                path: predicate.path().to_string(),
            });
        };
        predicate.check_type(ty).map_err(|reason| DefinitionError::PredicateTypeMismatch {
            owner: owner.to_string(),
            predicate: predicate.to_string(),
            reason,
        })?;
    }
    Ok(())
}

/// Ensures a rule result can produce the table's output type.
fn ensure_result_fits(spec: &DecisionTableSpec, rule: &RuleSpec) -> Result<(), DefinitionError> {
    let invalid = |reason: String| DefinitionError::InvalidResult {
        table: spec.table_id.clone(),
        rule: rule.rule_id.clone(),
        reason,
    };
    match &rule.then {
        RuleResult::Literal(value) => {
            if spec.output.accepts(value) {
                Ok(())
            } else {
                Err(invalid(format!("{} literal does not fit output type {}", value.kind(), spec.output)))
            }
        }
        RuleResult::Linear {
            field,
            coefficient,
            offset,
        } => {
            if spec.output != ValueType::Float {
                return Err(invalid(format!("linear results require a float output, found {}", spec.output)));
            }
            if !coefficient.is_finite() || !offset.is_finite() {
                return Err(invalid("linear coefficients must be finite".to_string()));
            }
            let operand = spec.input.field_type(field.head().as_str()).and_then(|ty| ty.resolve_path(field.rest()));
            match operand {
                Some(ty) if ty.is_numeric() => Ok(()),
                Some(ty) => Err(invalid(format!("linear operand `{field}` is {ty}, not numeric"))),
                None => Err(invalid(format!("linear operand `{field}` is not a declared input field"))),
            }
        }
    }
}
