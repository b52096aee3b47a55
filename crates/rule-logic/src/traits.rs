// crates/rule-logic/src/traits.rs
// ============================================================================
// Module: Predicate Evaluation Traits
// Description: Contracts for evaluating leaf predicates and observing evaluation.
// Purpose: Let domains plug leaf semantics into the universal requirement tree.
// Dependencies: none
// ============================================================================

//! ## Overview
//! A leaf predicate evaluates against a domain-specific reader (an input
//! record, an execution context, ...). The tree itself never inspects data; it
//! only combines leaf outcomes. Trace hooks observe exactly which leaves ran,
//! which is how short-circuiting is made visible to callers and tests.

// ============================================================================
// SECTION: Predicate Trait
// ============================================================================

/// Core trait for leaf predicate evaluation
///
/// Predicates are pure: the same reader must always produce the same answer
/// and evaluation must not mutate anything observable.
pub trait PredicateEval {
    /// Domain-specific reader type the predicate reads fields from
    type Reader<'a>;

    /// Evaluates the predicate against the reader
    fn eval(&self, reader: &Self::Reader<'_>) -> bool;
}

// ============================================================================
// SECTION: Trace Hooks
// ============================================================================

/// Observer notified for every leaf predicate that is actually evaluated
pub trait RequirementTrace<P> {
    /// Called after a leaf predicate has been evaluated
    fn on_predicate_evaluated(&mut self, predicate: &P, result: bool);
}

/// Trace hook that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl<P> RequirementTrace<P> for NoopTrace {
    fn on_predicate_evaluated(&mut self, _predicate: &P, _result: bool) {}
}

impl<P: Clone> RequirementTrace<P> for Vec<(P, bool)> {
    fn on_predicate_evaluated(&mut self, predicate: &P, result: bool) {
        self.push((predicate.clone(), result));
    }
}
