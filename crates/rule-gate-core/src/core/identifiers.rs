// crates/rule-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Rule Gate Identifiers
// Description: Opaque string identifiers for tables, orchestrators, and fields.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as plain strings. Validation (for
//! example uniqueness of step names) happens when definitions are registered,
//! not inside these wrappers. Field and step names additionally have to be
//! condition identifiers, since conditions read them back from text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Grammar
// ============================================================================

/// Words the condition language reserves; they cannot name fields or steps.
const RESERVED_WORDS: [&str; 5] = ["and", "or", "not", "true", "false"];

/// Returns true when `text` matches `[A-Za-z_][A-Za-z0-9_]*` and is not reserved.
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    let starts_well = bytes.next().is_some_and(|first| first.is_ascii_alphabetic() || first == b'_');
    starts_well
        && bytes.all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
        && !RESERVED_WORDS.contains(&text)
}

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the shared helper impls.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Identifier of a decision table (a rule domain such as `access_level`).
    TableId
}

string_identifier! {
    /// Identifier of an orchestration.
    OrchestratorId
}

string_identifier! {
    /// Step name; doubles as the step's key in the execution context.
    StepName
}

string_identifier! {
    /// Name of a field in a record.
    FieldName
}

string_identifier! {
    /// Identifier of a rule within a decision table.
    RuleId
}

impl StepName {
    /// Returns true when the name can be referenced from a gate condition.
    #[must_use]
    pub fn is_identifier(&self) -> bool {
        is_identifier(&self.0)
    }
}

impl FieldName {
    /// Returns true when the name can be referenced from a condition path.
    #[must_use]
    pub fn is_identifier(&self) -> bool {
        is_identifier(&self.0)
    }
}
