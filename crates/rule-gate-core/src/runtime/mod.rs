// crates/rule-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Rule Gate Runtime
// Description: Registry, engine, orchestration runner, and audit sinks.
// Purpose: Execute validated definitions deterministically.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime types own no definitions of their own; they execute what the
//! [`Definitions`] registry validated.

pub mod audit;
pub mod context;
pub mod control;
pub mod engine;
pub mod orchestrator;
pub mod registry;

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::JsonlAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use context::ContextEntry;
pub use context::ExecutionContext;
pub use control::CancelHandle;
pub use control::Interruption;
pub use control::RunControl;
pub use engine::Engine;
pub use engine::EngineConfig;
pub use orchestrator::OrchestrationError;
pub use orchestrator::Orchestrator;
pub use orchestrator::RunReport;
pub use orchestrator::RunStatus;
pub use orchestrator::StepFailure;
pub use registry::Definitions;
