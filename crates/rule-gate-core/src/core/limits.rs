// crates/rule-gate-core/src/core/limits.rs
// ============================================================================
// Module: Definition Limits
// Description: Structural bounds enforced when definitions are registered.
// Purpose: Keep table, orchestration, and condition sizes bounded.
// Dependencies: rule-logic, serde
// ============================================================================

//! ## Overview
//! Limits are checked once, at registration. Evaluation never re-checks them.

use rule_logic::RequirementValidator;
use rule_logic::validator::DEFAULT_MAX_DEPTH;
use rule_logic::validator::DEFAULT_MAX_NODES;
use serde::Deserialize;
use serde::Serialize;

/// Default maximum rules per decision table.
pub const DEFAULT_MAX_RULES: usize = 1024;
/// Default maximum steps per orchestration.
pub const DEFAULT_MAX_STEPS: usize = 256;
/// Default maximum orchestration nesting depth.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

/// Structural limits applied to registered definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Maximum rules in one decision table.
    pub max_rules: usize,
    /// Maximum steps in one orchestration.
    pub max_steps: usize,
    /// Maximum depth of orchestrations nested inside orchestrations.
    pub max_nesting_depth: usize,
    /// Maximum nesting depth of a rule predicate or gate condition.
    pub max_condition_depth: usize,
    /// Maximum node count of a rule predicate or gate condition.
    pub max_condition_nodes: usize,
}

impl EngineLimits {
    /// Returns the condition validator for these limits.
    #[must_use]
    pub const fn condition_validator(&self) -> RequirementValidator {
        RequirementValidator::new(self.max_condition_depth, self.max_condition_nodes)
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_rules: DEFAULT_MAX_RULES,
            max_steps: DEFAULT_MAX_STEPS,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_condition_depth: DEFAULT_MAX_DEPTH,
            max_condition_nodes: DEFAULT_MAX_NODES,
        }
    }
}
