// crates/rule-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Rule Gate Audit Events
// Description: Structured audit events for table evaluations and runs.
// Purpose: Emit machine-readable evaluation logs without hard dependencies.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The engine reports what it did as [`AuditEvent`] values delivered to an
//! [`AuditSink`]. Events are JSON-serializable and tagged by `event`. Sinks
//! are best-effort: a failing sink never changes an evaluation outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::OrchestratorId;
use crate::core::RuleId;
use crate::core::StepName;
use crate::core::TableId;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A decision table was evaluated.
    TableEvaluated {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Evaluated table.
        table_id: TableId,
        /// Matching rule index, when a rule matched.
        rule_index: Option<usize>,
        /// Matching rule identifier, when a rule matched.
        rule_id: Option<RuleId>,
        /// Outcome label (`matched`, `no_rule_matched`, `invalid_input`, ...).
        outcome: &'static str,
    },
    /// An orchestration step's target returned successfully.
    StepCompleted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Running orchestration.
        orchestrator_id: OrchestratorId,
        /// Completed step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
    },
    /// A step gate was evaluated.
    GateEvaluated {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Running orchestration.
        orchestrator_id: OrchestratorId,
        /// Gated step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
        /// Rendered gate condition.
        condition: String,
        /// Whether the gate passed.
        passed: bool,
    },
    /// An orchestration run reached a terminal state.
    RunFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Finished orchestration.
        orchestrator_id: OrchestratorId,
        /// Terminal status label.
        status: &'static str,
        /// Steps completed before the run ended.
        completed_steps: usize,
    },
}

impl AuditEvent {
    /// Returns the event identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TableEvaluated {
                ..
            } => "table_evaluated",
            Self::StepCompleted {
                ..
            } => "step_completed",
            Self::GateEvaluated {
                ..
            } => "gate_evaluated",
            Self::RunFinished {
                ..
            } => "run_finished",
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event);
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Box<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event);
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// No-op audit sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
#[derive(Debug)]
pub struct JsonlAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl JsonlAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    /// Recorded events in order.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded event names in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(AuditEvent::name).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
