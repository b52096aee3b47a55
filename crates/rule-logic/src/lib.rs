// crates/rule-logic/src/lib.rs
// ============================================================================
// Module: Rule Logic Root
// Description: Public API surface for the boolean predicate algebra.
// Purpose: Wire together the requirement tree, literals, evaluation traits,
//          structural validation, and the expression DSL.
// Dependencies: crate::{dsl, literal, requirement, traits, validator}
// ============================================================================

//! ## Overview
//! `rule-logic` is the domain-agnostic half of rule evaluation. It knows how to
//! combine leaf predicates with AND/OR/NOT, how to short-circuit them, and how
//! to parse predicate text into a tree. What a leaf *means* is supplied by the
//! caller through [`PredicateEval`] and [`dsl::AtomResolver`].

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod dsl;
pub mod literal;
pub mod requirement;
pub mod traits;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dsl::AtomResolver;
pub use dsl::DslError;
pub use dsl::parse_requirement;
pub use literal::Comparator;
pub use literal::Literal;
pub use requirement::Requirement;
pub use traits::NoopTrace;
pub use traits::PredicateEval;
pub use traits::RequirementTrace;
pub use validator::RequirementValidator;
pub use validator::ValidationError;
