// crates/rule-gate-core/src/runtime/context.rs
// ============================================================================
// Module: Execution Context
// Description: Per-run, append-only map from step name to step result.
// Purpose: Carry typed step results between steps, gates, and outputs.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Each run owns one fresh [`ExecutionContext`]. Entries are appended in step
//! order and never replaced, so the context always reads as "completed
//! through step N". Gates read it through [`FieldSource`] using paths whose
//! first segment is a step name (`check_access`, `quote.total`).

use serde::Serialize;

use crate::core::FieldPath;
use crate::core::FieldSource;
use crate::core::StepName;
use crate::core::Value;

/// Typed step results of one run, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
    /// Completed steps and their results.
    entries: Vec<ContextEntry>,
}

/// One completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    /// Step name.
    pub step: StepName,
    /// Step result.
    pub value: Value,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a completed step's result.
    pub(crate) fn record(&mut self, step: StepName, value: Value) {
        self.entries.push(ContextEntry {
            step,
            value,
        });
    }

    /// Returns a step's result.
    #[must_use]
    pub fn get(&self, step: &str) -> Option<&Value> {
        self.entries.iter().find(|entry| entry.step.as_str() == step).map(|entry| &entry.value)
    }

    /// Returns the completed entries in order.
    #[must_use]
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Returns the number of completed steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no step has completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recently completed step.
    #[must_use]
    pub fn last_completed(&self) -> Option<&StepName> {
        self.entries.last().map(|entry| &entry.step)
    }
}

impl FieldSource for ExecutionContext {
    fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path.head().as_str())?.get_path(path.rest())
    }
}
