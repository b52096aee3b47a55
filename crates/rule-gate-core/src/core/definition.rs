// crates/rule-gate-core/src/core/definition.rs
// ============================================================================
// Module: Definition Errors
// Description: Static consistency errors found when definitions are registered.
// Purpose: Report structural defects in tables and orchestrations before any run.
// Dependencies: crate::core::identifiers, rule-logic, thiserror
// ============================================================================

//! ## Overview
//! A [`DefinitionError`] means a table or orchestration is internally
//! inconsistent: a mapping names a step that has not run yet, a predicate
//! reads an undeclared field, an output has no source. These are detected when
//! the definition is registered and never surface during a run.

use rule_logic::ValidationError;
use thiserror::Error;

use crate::core::identifiers::FieldName;
use crate::core::identifiers::OrchestratorId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::StepName;
use crate::core::identifiers::TableId;
use crate::core::value::ShapeDefect;

/// Static consistency errors in table or orchestration definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A table with this identifier is already registered.
    #[error("duplicate table identifier: {0}")]
    DuplicateTable(TableId),
    /// An orchestration with this identifier is already registered.
    #[error("duplicate orchestrator identifier: {0}")]
    DuplicateOrchestrator(OrchestratorId),
    /// A table declares no rules.
    #[error("table `{table}` must declare at least one rule")]
    EmptyTable {
        /// Offending table.
        table: TableId,
    },
    /// A table declares more rules than allowed.
    #[error("table `{table}` declares {count} rules (max {max})")]
    TooManyRules {
        /// Offending table.
        table: TableId,
        /// Declared rule count.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Two rules share an identifier.
    #[error("table `{table}` declares rule `{rule}` more than once")]
    DuplicateRuleId {
        /// Offending table.
        table: TableId,
        /// Repeated rule identifier.
        rule: RuleId,
    },
    /// A record shape declares a field twice.
    #[error("{owner} declares field `{field}` more than once")]
    DuplicateField {
        /// Table, orchestration, or output owning the shape.
        owner: String,
        /// Dotted path of the repeated field.
        field: String,
    },
    /// A record shape declares a field whose name conditions cannot reference.
    #[error("{owner} declares field `{field}`, which is not an identifier")]
    InvalidFieldName {
        /// Table, orchestration, or output owning the shape.
        owner: String,
        /// Dotted path of the offending field.
        field: String,
    },
    /// A table output type is a record.
    #[error("table `{table}` output must be a scalar type")]
    OutputNotScalar {
        /// Offending table.
        table: TableId,
    },
    /// A rule result does not fit the table output type.
    #[error("rule `{rule}` in table `{table}`: {reason}")]
    InvalidResult {
        /// Offending table.
        table: TableId,
        /// Offending rule.
        rule: RuleId,
        /// Why the result was rejected.
        reason: String,
    },
    /// A predicate reads a field that does not exist.
    #[error("{owner}: `{path}` does not name a declared field")]
    UnknownPredicateField {
        /// Rule or gate owning the predicate.
        owner: String,
        /// Offending path.
        path: String,
    },
    /// A predicate compares a field of the wrong type.
    #[error("{owner}: predicate `{predicate}` is ill-typed: {reason}")]
    PredicateTypeMismatch {
        /// Rule or gate owning the predicate.
        owner: String,
        /// Rendered predicate.
        predicate: String,
        /// Why the types disagree.
        reason: &'static str,
    },
    /// A predicate tree exceeds structural limits.
    #[error("{owner}: {source}")]
    ConditionTooComplex {
        /// Rule or gate owning the predicate.
        owner: String,
        /// Structural violation.
        source: ValidationError,
    },
    /// An orchestration declares no steps.
    #[error("orchestrator `{orchestrator}` must declare at least one step")]
    EmptyOrchestrator {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
    },
    /// An orchestration declares more steps than allowed.
    #[error("orchestrator `{orchestrator}` declares {count} steps (max {max})")]
    TooManySteps {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Declared step count.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Orchestrations are nested deeper than allowed.
    #[error("orchestrator `{orchestrator}` nests {depth} levels deep (max {max})")]
    NestingTooDeep {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Nesting depth it would have.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A step name is not an identifier, so gates could not reference it.
    #[error("orchestrator `{orchestrator}` declares step `{step}`, which is not an identifier")]
    InvalidStepName {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step name.
        step: StepName,
    },
    /// Two steps share a name.
    #[error("orchestrator `{orchestrator}` declares step `{step}` more than once")]
    DuplicateStep {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Repeated step name.
        step: StepName,
    },
    /// A step declares a zero time budget.
    #[error("step `{step}` in `{orchestrator}` declares a zero time budget")]
    ZeroStepBudget {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
    },
    /// A step declares a gate message without a gate.
    #[error("step `{step}` in `{orchestrator}` declares a gate message but no gate")]
    GateMessageWithoutGate {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
    },
    /// A step targets a table or orchestration that is not registered.
    #[error("step `{step}` in `{orchestrator}` targets unknown {target}")]
    UnknownTarget {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
        /// Rendered target reference.
        target: String,
    },
    /// A step binds a field its target does not declare.
    #[error("step `{step}` in `{orchestrator}` binds unknown target field `{field}`")]
    UnknownBindingField {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
        /// Unknown field.
        field: FieldName,
    },
    /// A step binds the same target field twice.
    #[error("step `{step}` in `{orchestrator}` binds field `{field}` more than once")]
    DuplicateBinding {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
        /// Repeated field.
        field: FieldName,
    },
    /// A step leaves a target input field unbound.
    #[error("step `{step}` in `{orchestrator}` does not bind target field `{field}`")]
    MissingBinding {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Offending step.
        step: StepName,
        /// Unbound field.
        field: FieldName,
    },
    /// A source reads an orchestration input field that is not declared.
    #[error("{owner} in `{orchestrator}` reads undeclared input field `{field}`")]
    UnknownInputField {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Step, gate, or output doing the read.
        owner: String,
        /// Undeclared field.
        field: FieldName,
    },
    /// A source or gate reads a step that runs at or after the reader.
    #[error("{owner} in `{orchestrator}` reads step `{step}` before it has run")]
    ForwardStepReference {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Step, gate, or output doing the read.
        owner: String,
        /// Step read too early.
        step: StepName,
    },
    /// A source or gate reads a step that is never declared.
    #[error("{owner} in `{orchestrator}` reads undeclared step `{step}`")]
    UnknownStepReference {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Step, gate, or output doing the read.
        owner: String,
        /// Undeclared step.
        step: StepName,
    },
    /// A path does not exist inside a step's output.
    #[error("{owner} in `{orchestrator}` reads `{path}`, which step `{step}` does not produce")]
    InvalidStepPath {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Step, gate, or output doing the read.
        owner: String,
        /// Step whose output was read.
        step: StepName,
        /// Offending path.
        path: String,
    },
    /// A source value type is not assignable to its destination.
    #[error("{owner} in `{orchestrator}` expects {expected}, source provides {found}")]
    SourceTypeMismatch {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Destination field description.
        owner: String,
        /// Declared destination type.
        expected: String,
        /// Source type.
        found: String,
    },
    /// Two output fields share a name.
    #[error("orchestrator `{orchestrator}` declares output `{field}` more than once")]
    DuplicateOutput {
        /// Offending orchestration.
        orchestrator: OrchestratorId,
        /// Repeated output field.
        field: FieldName,
    },
}

impl DefinitionError {
    /// Reports a shape defect found in the shape owned by `owner`.
    pub(crate) fn shape(owner: String, defect: ShapeDefect) -> Self {
        match defect {
            ShapeDefect::DuplicateField(field) => Self::DuplicateField {
                owner,
                field,
            },
            ShapeDefect::InvalidFieldName(field) => Self::InvalidFieldName {
                owner,
                field,
            },
        }
    }
}
