// crates/rule-gate-core/src/lib.rs
// ============================================================================
// Module: Rule Gate Core Library
// Description: Public API surface for decision tables and orchestrations.
// Purpose: Expose core types, the invocation seam, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}, rule-logic
// ============================================================================

//! ## Overview
//! Rule Gate evaluates ordered decision tables (first matching rule wins) and
//! runs orchestrations that chain tables and nested orchestrations through a
//! typed execution context, with a gate after any step. Definitions are
//! validated once when they are registered; evaluation is pure, and the same
//! input always yields the same output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::StepInvoker;
pub use rule_logic::Comparator;
pub use rule_logic::Literal;
pub use rule_logic::Requirement;
pub use runtime::AuditEvent;
pub use runtime::AuditSink;
pub use runtime::CancelHandle;
pub use runtime::ContextEntry;
pub use runtime::Definitions;
pub use runtime::Engine;
pub use runtime::EngineConfig;
pub use runtime::ExecutionContext;
pub use runtime::InMemoryAuditSink;
pub use runtime::Interruption;
pub use runtime::JsonlAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::OrchestrationError;
pub use runtime::Orchestrator;
pub use runtime::RunControl;
pub use runtime::RunReport;
pub use runtime::RunStatus;
pub use runtime::StderrAuditSink;
pub use runtime::StepFailure;
