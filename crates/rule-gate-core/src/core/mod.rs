// crates/rule-gate-core/src/core/mod.rs
// ============================================================================
// Module: Rule Gate Core Types
// Description: Values, predicates, decision tables, and orchestration definitions.
// Purpose: Provide stable, serializable definition types with eager validation.
// Dependencies: rule-logic, serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are the immutable definitions the runtime executes. Tables and
//! orchestrations are validated once, when constructed or registered, so the
//! runtime can assume every reference resolves.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod definition;
pub mod identifiers;
pub mod limits;
pub mod orchestration;
pub mod predicate;
pub mod table;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use definition::DefinitionError;
pub use identifiers::FieldName;
pub use identifiers::OrchestratorId;
pub use identifiers::RuleId;
pub use identifiers::StepName;
pub use identifiers::TableId;
pub use identifiers::is_identifier;
pub use limits::EngineLimits;
pub use orchestration::InputBinding;
pub use orchestration::OrchestratorSpec;
pub use orchestration::OutputField;
pub use orchestration::StepSpec;
pub use orchestration::StepTarget;
pub use orchestration::TargetCatalog;
pub use orchestration::TargetSignature;
pub use orchestration::ValidatedOrchestration;
pub use orchestration::ValueSource;
pub use predicate::FieldPath;
pub use predicate::FieldPredicate;
pub use predicate::FieldPredicateResolver;
pub use predicate::FieldReader;
pub use predicate::FieldSource;
pub use predicate::InvalidFieldPath;
pub use predicate::parse_condition;
pub use table::DecisionTable;
pub use table::DecisionTableSpec;
pub use table::EvaluationError;
pub use table::NoRuleMatched;
pub use table::RuleResult;
pub use table::RuleSpec;
pub use table::TableMatch;
pub use value::FieldSpec;
pub use value::InputError;
pub use value::Record;
pub use value::RecordShape;
pub use value::ShapeDefect;
pub use value::Value;
pub use value::ValueType;
