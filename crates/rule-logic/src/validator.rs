// crates/rule-logic/src/validator.rs
// ============================================================================
// Module: Requirement Validation
// Description: Structural limits for requirement trees.
// Purpose: Reject trees that are too deep or too large before they are used.
// Dependencies: crate::requirement, std::fmt
// ============================================================================

//! ## Overview
//! Structural validation runs once, when a tree is parsed or a definition is
//! registered. Domain checks (do the referenced fields exist?) belong to the
//! caller; this module only bounds the shape of the tree.

use std::fmt;

use crate::requirement::Requirement;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum nesting depth of a requirement tree.
pub const DEFAULT_MAX_DEPTH: usize = 32;
/// Default maximum number of nodes in a requirement tree.
pub const DEFAULT_MAX_NODES: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural validation failures.
///
/// # Invariants
/// - None. Variants capture structured validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Requirement tree exceeds the configured depth.
    TooDeep {
        /// Maximum supported tree depth
        max_depth: usize,
        /// Depth of the offending tree
        actual_depth: usize,
    },
    /// Requirement tree has too many nodes.
    TooLarge {
        /// Maximum supported node count
        max_nodes: usize,
        /// Node count of the offending tree
        actual_nodes: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooDeep {
                max_depth,
                actual_depth,
            } => write!(f, "requirement tree too deep: {actual_depth} levels (max {max_depth})"),
            Self::TooLarge {
                max_nodes,
                actual_nodes,
            } => write!(f, "requirement tree too large: {actual_nodes} nodes (max {max_nodes})"),
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validates requirement trees against structural limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementValidator {
    /// Maximum allowed nesting depth.
    max_depth: usize,
    /// Maximum allowed node count.
    max_nodes: usize,
}

impl Default for RequirementValidator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RequirementValidator {
    /// Creates a validator with explicit limits
    #[must_use]
    pub const fn new(max_depth: usize, max_nodes: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
        }
    }

    /// Creates a validator with default limits
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES)
    }

    /// Validates a requirement tree
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the tree violates a structural limit.
    pub fn validate<P>(&self, requirement: &Requirement<P>) -> Result<(), ValidationError> {
        let actual_depth = requirement.depth();
        if actual_depth > self.max_depth {
            return Err(ValidationError::TooDeep {
                max_depth: self.max_depth,
                actual_depth,
            });
        }
        let actual_nodes = requirement.complexity();
        if actual_nodes > self.max_nodes {
            return Err(ValidationError::TooLarge {
                max_nodes: self.max_nodes,
                actual_nodes,
            });
        }
        Ok(())
    }
}
