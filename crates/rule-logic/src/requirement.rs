// crates/rule-logic/src/requirement.rs
// ============================================================================
// Module: Requirement Core Types
// Description: Boolean algebra over typed leaf predicates.
// Purpose: Define `Requirement` with short-circuit evaluation, tracing,
//          structural helpers, and human-readable rendering.
// Dependencies: serde, smallvec, crate::traits
// ============================================================================

//! ## Overview
//! A [`Requirement`] is a tagged-variant expression tree: constants, leaf
//! predicates, and AND/OR/NOT composition. The tree is data, not code, so one
//! evaluator serves every rule table and every orchestration gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::traits::NoopTrace;
use crate::traits::PredicateEval;
use crate::traits::RequirementTrace;

// ============================================================================
// SECTION: Requirement Definition
// ============================================================================

/// Universal requirement tree with domain-specific leaves
///
/// The logical operators are domain-agnostic; the `Predicate` variant is the
/// boundary where domain semantics are injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement<P> {
    /// Constant truth value
    Constant(bool),

    /// Logical AND: all sub-requirements must be satisfied
    ///
    /// Evaluation short-circuits on the first failure. Empty And is
    /// trivially satisfied.
    And(SmallVec<[Box<Self>; 4]>),

    /// Logical OR: at least one sub-requirement must be satisfied
    ///
    /// Evaluation short-circuits on the first success. Empty Or is
    /// trivially unsatisfiable.
    Or(SmallVec<[Box<Self>; 4]>),

    /// Logical NOT: inverts the result of the sub-requirement
    Not(Box<Self>),

    /// Domain-specific atomic predicate
    Predicate(P),
}

// ============================================================================
// SECTION: Execution Helpers
// ============================================================================

impl<P> Requirement<P> {
    /// Evaluates this requirement with short-circuiting
    pub fn eval(&self, reader: &P::Reader<'_>) -> bool
    where
        P: PredicateEval,
    {
        let mut trace = NoopTrace;
        self.eval_with_trace(reader, &mut trace)
    }

    /// Evaluates this requirement and reports each leaf actually evaluated
    pub fn eval_with_trace<T>(&self, reader: &P::Reader<'_>, trace: &mut T) -> bool
    where
        P: PredicateEval,
        T: RequirementTrace<P>,
    {
        match self {
            Self::Constant(value) => *value,
            Self::Predicate(predicate) => {
                let result = predicate.eval(reader);
                trace.on_predicate_evaluated(predicate, result);
                result
            }
            Self::Not(requirement) => !requirement.eval_with_trace(reader, trace),
            Self::And(requirements) => {
                for req in requirements {
                    if !req.eval_with_trace(reader, trace) {
                        return false;
                    }
                }
                true
            }
            Self::Or(requirements) => {
                for req in requirements {
                    if req.eval_with_trace(reader, trace) {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Returns the complexity of this requirement tree
    pub fn complexity(&self) -> usize {
        match self {
            Self::Constant(_) | Self::Predicate(_) => 1,
            Self::Not(req) => 1 + req.complexity(),
            Self::And(reqs) | Self::Or(reqs) => {
                1 + reqs.iter().map(|r| r.complexity()).sum::<usize>()
            }
        }
    }

    /// Returns the nesting depth of this requirement tree (a leaf is depth 0)
    pub fn depth(&self) -> usize {
        match self {
            Self::Constant(_) | Self::Predicate(_) => 0,
            Self::Not(req) => 1 + req.depth(),
            Self::And(reqs) | Self::Or(reqs) => {
                1 + reqs.iter().map(|r| r.depth()).max().unwrap_or(0)
            }
        }
    }

    /// Visits every leaf predicate in declaration order
    pub fn for_each_predicate<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a P),
    {
        match self {
            Self::Constant(_) => {}
            Self::Predicate(predicate) => f(predicate),
            Self::Not(req) => req.for_each_predicate(f),
            Self::And(reqs) | Self::Or(reqs) => {
                for req in reqs {
                    req.for_each_predicate(f);
                }
            }
        }
    }

    /// Collects references to every leaf predicate in declaration order
    pub fn predicates(&self) -> Vec<&P> {
        let mut out = Vec::new();
        self.for_each_predicate(&mut |predicate| out.push(predicate));
        out
    }
}

// ============================================================================
// SECTION: Constructor Helpers
// ============================================================================

impl<P> Requirement<P> {
    /// Creates a logical AND of the given requirements
    pub fn and(requirements: Vec<Self>) -> Self {
        Self::And(requirements.into_iter().map(Box::new).collect())
    }

    /// Creates a logical OR of the given requirements
    pub fn or(requirements: Vec<Self>) -> Self {
        Self::Or(requirements.into_iter().map(Box::new).collect())
    }

    /// Creates a logical NOT of the given requirement
    pub fn negate(requirement: Self) -> Self {
        Self::Not(Box::new(requirement))
    }

    /// Creates a requirement from a predicate
    pub const fn predicate(predicate: P) -> Self {
        Self::Predicate(predicate)
    }

    /// Creates a requirement that always holds
    pub const fn always() -> Self {
        Self::Constant(true)
    }

    /// Creates a requirement that never holds
    pub const fn never() -> Self {
        Self::Constant(false)
    }
}

impl<P> std::ops::Not for Requirement<P> {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl<P> Default for Requirement<P> {
    /// Creates an empty And requirement (trivially satisfied)
    fn default() -> Self {
        Self::And(SmallVec::new())
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Operator precedence used when deciding whether to parenthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `!` and atoms
    Unary,
}

impl<P: fmt::Display> Requirement<P> {
    /// Precedence of the rendered form of this node.
    fn precedence(&self) -> Precedence {
        match self {
            Self::And(reqs) if reqs.len() > 1 => Precedence::And,
            Self::Or(reqs) if reqs.len() > 1 => Precedence::Or,
            Self::And(reqs) | Self::Or(reqs) => {
                reqs.first().map_or(Precedence::Unary, |req| req.precedence())
            }
            Self::Constant(_) | Self::Not(_) | Self::Predicate(_) => Precedence::Unary,
        }
    }

    /// Renders a child, wrapping it in parentheses when it binds looser than `parent`.
    fn fmt_child(child: &Self, parent: Precedence, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < parent { write!(f, "({child})") } else { write!(f, "{child}") }
    }

    /// Renders an n-ary operator.
    fn fmt_joined(
        reqs: &[Box<Self>],
        separator: &str,
        empty: &str,
        parent: Precedence,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match reqs {
            [] => f.write_str(empty),
            [only] => write!(f, "{only}"),
            _ => {
                for (index, req) in reqs.iter().enumerate() {
                    if index > 0 {
                        f.write_str(separator)?;
                    }
                    Self::fmt_child(req, parent, f)?;
                }
                Ok(())
            }
        }
    }
}

impl<P: fmt::Display> fmt::Display for Requirement<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value}"),
            Self::Predicate(predicate) => write!(f, "{predicate}"),
            Self::Not(inner) => {
                f.write_str("!")?;
                Self::fmt_child(inner, Precedence::Unary, f)
            }
            Self::And(reqs) => Self::fmt_joined(reqs, " && ", "true", Precedence::And, f),
            Self::Or(reqs) => Self::fmt_joined(reqs, " || ", "false", Precedence::Or, f),
        }
    }
}
