// crates/rule-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Rule Gate Engine
// Description: Invocation API over registered tables and orchestrations.
// Purpose: Evaluate tables and run orchestrations with audit and run control.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The engine is the production [`StepInvoker`]: orchestrations call back into
//! it for every step, so nested orchestrations share the caller's control and
//! audit sink. It holds no per-run state; every call gets a fresh execution
//! context, and one engine can serve concurrent callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::core::EvaluationError;
use crate::core::OrchestratorId;
use crate::core::Record;
use crate::core::StepTarget;
use crate::core::TableId;
use crate::core::TableMatch;
use crate::core::Value;
use crate::interfaces::StepInvoker;
use crate::runtime::audit::AuditEvent;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::now_ms;
use crate::runtime::context::ExecutionContext;
use crate::runtime::control::RunControl;
use crate::runtime::orchestrator::OrchestrationError;
use crate::runtime::orchestrator::RunReport;
use crate::runtime::orchestrator::RunStatus;
use crate::runtime::orchestrator::StepFailure;
use crate::runtime::registry::Definitions;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine runtime configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline applied to runs started through [`Engine::run`].
    pub run_deadline: Option<Duration>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Shared entry point for table evaluation and orchestration runs.
#[derive(Debug, Clone)]
pub struct Engine<S = NoopAuditSink> {
    /// Registered definitions.
    definitions: Arc<Definitions>,
    /// Runtime configuration.
    config: EngineConfig,
    /// Audit destination.
    audit: S,
}

impl Engine<NoopAuditSink> {
    /// Creates an engine that discards audit events.
    #[must_use]
    pub fn new(definitions: impl Into<Arc<Definitions>>, config: EngineConfig) -> Self {
        Self {
            definitions: definitions.into(),
            config,
            audit: NoopAuditSink,
        }
    }
}

impl<S: AuditSink> Engine<S> {
    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit<T: AuditSink>(self, audit: T) -> Engine<T> {
        Engine {
            definitions: self.definitions,
            config: self.config,
            audit,
        }
    }

    /// Returns the registered definitions.
    #[must_use]
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a fresh run control carrying the configured deadline.
    #[must_use]
    pub fn run_control(&self) -> RunControl {
        match self.config.run_deadline {
            Some(timeout) => RunControl::new().with_timeout(timeout),
            None => RunControl::new(),
        }
    }

    /// Evaluates a registered decision table.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the table is unknown, the input does
    /// not fit, or no rule matches.
    pub fn evaluate(&self, table_id: &TableId, input: &Record) -> Result<Value, EvaluationError> {
        self.evaluate_traced(table_id, input).map(|matched| matched.value)
    }

    /// Evaluates a registered decision table and reports the matching rule.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::evaluate`].
    pub fn evaluate_traced(
        &self,
        table_id: &TableId,
        input: &Record,
    ) -> Result<TableMatch, EvaluationError> {
        let result = match self.definitions.table(table_id) {
            Some(table) => table.evaluate_traced(input),
            None => Err(EvaluationError::UnknownTable(table_id.clone())),
        };
        let (rule_index, rule_id, outcome) = match &result {
            Ok(matched) => (Some(matched.rule_index), Some(matched.rule_id.clone()), "matched"),
            Err(error) => (None, None, evaluation_label(error)),
        };
        self.audit.record(&AuditEvent::TableEvaluated {
            timestamp_ms: now_ms(),
            table_id: table_id.clone(),
            rule_index,
            rule_id,
            outcome,
        });
        result
    }

    /// Runs a registered orchestration under the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError`] for the first failure; no partial output
    /// is produced.
    pub fn run(
        &self,
        orchestrator_id: &OrchestratorId,
        input: &Record,
    ) -> Result<Record, OrchestrationError> {
        self.run_with(orchestrator_id, input, &self.run_control())
    }

    /// Runs a registered orchestration under an explicit control.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::run`].
    pub fn run_with(
        &self,
        orchestrator_id: &OrchestratorId,
        input: &Record,
        control: &RunControl,
    ) -> Result<Record, OrchestrationError> {
        self.run_report(orchestrator_id, input, control).into_result()
    }

    /// Runs a registered orchestration and returns the full report.
    #[must_use]
    pub fn run_report(
        &self,
        orchestrator_id: &OrchestratorId,
        input: &Record,
        control: &RunControl,
    ) -> RunReport {
        let Some(orchestrator) = self.definitions.orchestrator(orchestrator_id) else {
            let error = OrchestrationError::UnknownOrchestrator(orchestrator_id.clone());
            self.audit.record(&AuditEvent::RunFinished {
                timestamp_ms: now_ms(),
                orchestrator_id: orchestrator_id.clone(),
                status: error.label(),
                completed_steps: 0,
            });
            return RunReport {
                status: RunStatus::Pending,
                context: ExecutionContext::new(),
                outcome: Err(error),
            };
        };
        orchestrator.execute(input, self, control, &self.audit)
    }
}

impl<S: AuditSink> StepInvoker for Engine<S> {
    fn invoke(
        &self,
        target: &StepTarget,
        input: &Record,
        control: &RunControl,
    ) -> Result<Value, StepFailure> {
        match target {
            StepTarget::Table(table_id) => Ok(self.evaluate(table_id, input)?),
            StepTarget::Orchestrator(orchestrator_id) => self
                .run_with(orchestrator_id, input, control)
                .map(Value::Record)
                .map_err(StepFailure::from),
        }
    }
}

/// Returns the audit outcome label for a table failure.
const fn evaluation_label(error: &EvaluationError) -> &'static str {
    match error {
        EvaluationError::UnknownTable(_) => "unknown_table",
        EvaluationError::InvalidInput {
            ..
        } => "invalid_input",
        EvaluationError::NoRuleMatched(_) => "no_rule_matched",
        EvaluationError::NonNumericOperand {
            ..
        } => "non_numeric_operand",
    }
}
