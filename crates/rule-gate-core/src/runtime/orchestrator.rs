// crates/rule-gate-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Orchestrator Runtime
// Description: Sequential step execution with gates and output projection.
// Purpose: Run validated orchestrations deterministically, failing fast.
// Dependencies: crate::{core, interfaces, runtime}, rule-logic, serde, thiserror
// ============================================================================

//! ## Overview
//! A run walks `Pending -> Running(i) -> {Succeeded, FailedAtStep(i), Cancelled}`.
//! For each step it binds the target input from the orchestration input and
//! the context, invokes the target, appends the result to the context, then
//! evaluates the step's gate against the context. The first failure ends the
//! run; nothing is retried because targets are pure. Only a run that reaches
//! the end produces an output record.
//!
//! A step with a time budget runs under a narrowed [`RunControl`]; the budget
//! is enforced at step boundaries like the run deadline, so a step that
//! overruns is reported as timed out and its result is discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::core::DefinitionError;
use crate::core::EngineLimits;
use crate::core::EvaluationError;
use crate::core::FieldReader;
use crate::core::InputError;
use crate::core::OrchestratorId;
use crate::core::OrchestratorSpec;
use crate::core::Record;
use crate::core::RecordShape;
use crate::core::StepName;
use crate::core::StepSpec;
use crate::core::TargetCatalog;
use crate::core::TargetSignature;
use crate::core::Value;
use crate::core::ValueSource;
use crate::core::ValueType;
use crate::interfaces::StepInvoker;
use crate::runtime::audit::AuditEvent;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::now_ms;
use crate::runtime::context::ExecutionContext;
use crate::runtime::control::Interruption;
use crate::runtime::control::RunControl;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Why a step's target invocation failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepFailure {
    /// A decision table failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    /// A nested orchestration failed.
    #[error(transparent)]
    Orchestration(Box<OrchestrationError>),
}

impl From<OrchestrationError> for StepFailure {
    fn from(error: OrchestrationError) -> Self {
        Self::Orchestration(Box::new(error))
    }
}

/// Orchestration run failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    /// No orchestration is registered under the identifier.
    #[error("unknown orchestrator identifier: {0}")]
    UnknownOrchestrator(OrchestratorId),
    /// The input record does not satisfy the orchestration's input shape.
    #[error("invalid input for orchestrator `{orchestrator_id}`: {source}")]
    InvalidInput {
        /// Orchestration being run.
        orchestrator_id: OrchestratorId,
        /// Shape violation.
        source: InputError,
    },
    /// A step's target failed.
    #[error("step `{step}` (index {step_index}) failed: {cause}")]
    StepFailed {
        /// Failing step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
        /// Underlying failure.
        #[source]
        cause: StepFailure,
    },
    /// A step's gate evaluated false.
    #[error(
        "gate failed at step `{step}` (index {step_index}): {condition}{}",
        gate_note(.message.as_deref())
    )]
    GateFailed {
        /// Gated step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
        /// Rendered gate condition.
        condition: String,
        /// Message declared on the step for this gate.
        message: Option<String>,
    },
    /// A step's target returned a value its declared result type rejects.
    #[error("step `{step}` (index {step_index}) returned a {found} value where {expected} is declared")]
    ResultTypeMismatch {
        /// Offending step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
        /// Declared result type of the target.
        expected: String,
        /// Kind of the returned value.
        found: &'static str,
    },
    /// A step overran its time budget.
    #[error("step `{step}` (index {step_index}) exceeded its {budget_ms} ms budget")]
    StepTimedOut {
        /// Offending step.
        step: StepName,
        /// Zero-based step index.
        step_index: usize,
        /// Declared budget in milliseconds.
        budget_ms: u64,
    },
    /// A step result did not have the shape its readers were validated against.
    #[error("step `{step}` (index {step_index}) could not read `{reference}`")]
    UnresolvedSource {
        /// Step or output owner doing the read.
        step: StepName,
        /// Zero-based index of the reading step; the step count for outputs.
        step_index: usize,
        /// Rendered source.
        reference: String,
    },
    /// The run was cancelled at a step boundary.
    #[error("run cancelled after {completed_steps} completed steps")]
    Cancelled {
        /// Steps completed before cancellation took effect.
        completed_steps: usize,
        /// Last completed step, if any.
        last_completed: Option<StepName>,
    },
    /// The run deadline passed at a step boundary.
    #[error("run deadline exceeded after {completed_steps} completed steps")]
    DeadlineExceeded {
        /// Steps completed before the deadline took effect.
        completed_steps: usize,
        /// Last completed step, if any.
        last_completed: Option<StepName>,
    },
}

/// Renders a declared gate message after the condition.
fn gate_note(message: Option<&str>) -> String {
    message.map(|text| format!(" ({text})")).unwrap_or_default()
}

impl OrchestrationError {
    /// Returns the interruption carried by this error, if it is one.
    #[must_use]
    pub const fn interruption(&self) -> Option<Interruption> {
        match self {
            Self::Cancelled {
                ..
            } => Some(Interruption::Cancelled),
            Self::DeadlineExceeded {
                ..
            } => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UnknownOrchestrator(_) => "unknown_orchestrator",
            Self::InvalidInput {
                ..
            } => "invalid_input",
            Self::StepFailed {
                ..
            } => "step_failed",
            Self::GateFailed {
                ..
            } => "gate_failed",
            Self::ResultTypeMismatch {
                ..
            } => "result_type_mismatch",
            Self::StepTimedOut {
                ..
            } => "step_timed_out",
            Self::UnresolvedSource {
                ..
            } => "unresolved_source",
            Self::Cancelled {
                ..
            } => "cancelled",
            Self::DeadlineExceeded {
                ..
            } => "deadline_exceeded",
        }
    }
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Per-run state machine position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// The run has not started; terminal only when the input was rejected.
    Pending,
    /// Step `step_index` is executing.
    Running {
        /// Zero-based step index.
        step_index: usize,
    },
    /// Every step completed and the output was projected.
    Succeeded,
    /// A step or its gate failed.
    FailedAtStep {
        /// Zero-based step index.
        step_index: usize,
        /// Failing step.
        step: StepName,
    },
    /// The run stopped at a step boundary (cancellation or deadline).
    Cancelled {
        /// Steps completed before stopping.
        completed_steps: usize,
    },
}

/// Terminal status, diagnostic context, and outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Final state machine position.
    pub status: RunStatus,
    /// Context "completed through step N".
    pub context: ExecutionContext,
    /// Projected output, or the failure.
    pub outcome: Result<Record, OrchestrationError>,
}

impl RunReport {
    /// Discards diagnostics and returns the outcome.
    ///
    /// # Errors
    ///
    /// Returns the run's [`OrchestrationError`] when it did not succeed.
    pub fn into_result(self) -> Result<Record, OrchestrationError> {
        self.outcome
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Validated, immutable orchestration.
#[derive(Debug, Clone, PartialEq)]
pub struct Orchestrator {
    /// Validated definition.
    spec: OrchestratorSpec,
    /// Projected output shape.
    output_shape: RecordShape,
    /// Nesting depth (1 when only tables are called).
    nesting_depth: usize,
    /// Declared result type of each step's target.
    step_outputs: Vec<ValueType>,
}

impl Orchestrator {
    /// Validates a definition against the registered targets.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when the definition is inconsistent.
    pub fn new(
        spec: OrchestratorSpec,
        catalog: &dyn TargetCatalog,
        limits: &EngineLimits,
    ) -> Result<Self, DefinitionError> {
        let validated = spec.validate(catalog, limits)?;
        Ok(Self {
            spec,
            output_shape: validated.output_shape,
            nesting_depth: validated.nesting_depth,
            step_outputs: validated.step_outputs,
        })
    }

    /// Returns the orchestration identifier.
    #[must_use]
    pub const fn orchestrator_id(&self) -> &OrchestratorId {
        &self.spec.orchestrator_id
    }

    /// Returns the validated definition.
    #[must_use]
    pub const fn spec(&self) -> &OrchestratorSpec {
        &self.spec
    }

    /// Returns the output record shape.
    #[must_use]
    pub const fn output_shape(&self) -> &RecordShape {
        &self.output_shape
    }

    /// Returns the signature used when this orchestration is a step target.
    #[must_use]
    pub fn signature(&self) -> TargetSignature {
        TargetSignature {
            input: self.spec.input.clone(),
            output: ValueType::Record(self.output_shape.clone()),
            nesting_depth: self.nesting_depth,
        }
    }

    /// Runs the orchestration with a fresh context.
    ///
    /// `control` is checked before every step and once before the output is
    /// projected; never while a target is executing. Step budgets are checked
    /// when the step returns.
    #[must_use]
    pub fn execute(
        &self,
        input: &Record,
        invoker: &dyn StepInvoker,
        control: &RunControl,
        audit: &dyn AuditSink,
    ) -> RunReport {
        let mut run = Run {
            orchestrator_id: &self.spec.orchestrator_id,
            status: RunStatus::Pending,
            context: ExecutionContext::new(),
            audit,
        };

        if let Err(source) = self.spec.input.check(input) {
            return run.finish(Err(OrchestrationError::InvalidInput {
                orchestrator_id: self.spec.orchestrator_id.clone(),
                source,
            }));
        }

        for (step_index, (step, expected)) in self.spec.steps.iter().zip(&self.step_outputs).enumerate() {
            if let Some(interruption) = control.interruption() {
                return run.interrupt(interruption);
            }
            run.status = RunStatus::Running {
                step_index,
            };

            let step_input = match bind_inputs(step, step_index, input, &run.context) {
                Ok(record) => record,
                Err(error) => return run.fail(step_index, step, error),
            };

            let step_control = step.timeout_ms.map(|budget_ms| control.within(Duration::from_millis(budget_ms)));
            let started = Instant::now();
            let outcome = invoker.invoke(&step.target, &step_input, step_control.as_ref().unwrap_or(control));
            let value = match outcome {
                Ok(value) => value,
                Err(cause) => {
                    // A nested run stopped only by the step budget times the step out;
                    // one stopped by the shared control stops this run too.
                    if let StepFailure::Orchestration(nested) = &cause
                        && let Some(interruption) = nested.interruption()
                    {
                        if control.interruption().is_none()
                            && let Some(budget_ms) = step.timeout_ms
                        {
                            return run.fail(step_index, step, timed_out(step, step_index, budget_ms));
                        }
                        return run.interrupt(interruption);
                    }
                    let error = OrchestrationError::StepFailed {
                        step: step.name.clone(),
                        step_index,
                        cause,
                    };
                    return run.fail(step_index, step, error);
                }
            };
            if let Some(budget_ms) = step.timeout_ms
                && started.elapsed() > Duration::from_millis(budget_ms)
            {
                return run.fail(step_index, step, timed_out(step, step_index, budget_ms));
            }
            if !expected.accepts(&value) {
                let error = OrchestrationError::ResultTypeMismatch {
                    step: step.name.clone(),
                    step_index,
                    expected: expected.to_string(),
                    found: value.kind(),
                };
                return run.fail(step_index, step, error);
            }
            run.context.record(step.name.clone(), expected.coerce(value));
            run.audit.record(&AuditEvent::StepCompleted {
                timestamp_ms: now_ms(),
                orchestrator_id: self.spec.orchestrator_id.clone(),
                step: step.name.clone(),
                step_index,
            });

            if let Some(gate) = &step.gate {
                let passed = gate.eval(&FieldReader::new(&run.context));
                let condition = gate.to_string();
                run.audit.record(&AuditEvent::GateEvaluated {
                    timestamp_ms: now_ms(),
                    orchestrator_id: self.spec.orchestrator_id.clone(),
                    step: step.name.clone(),
                    step_index,
                    condition: condition.clone(),
                    passed,
                });
                if !passed {
                    let error = OrchestrationError::GateFailed {
                        step: step.name.clone(),
                        step_index,
                        condition,
                        message: step.gate_message.clone(),
                    };
                    return run.fail(step_index, step, error);
                }
            }
        }

        if let Some(interruption) = control.interruption() {
            return run.interrupt(interruption);
        }

        let outcome = self.project_outputs(input, &run.context);
        if outcome.is_ok() {
            run.status = RunStatus::Succeeded;
        }
        run.finish(outcome)
    }

    /// Projects the final context and input into the output record.
    fn project_outputs(
        &self,
        input: &Record,
        context: &ExecutionContext,
    ) -> Result<Record, OrchestrationError> {
        let mut output = Record::new();
        for field in &self.spec.outputs {
            let value = resolve_source(&field.source, input, context).ok_or_else(|| {
                OrchestrationError::UnresolvedSource {
                    step: StepName::new(format!("output.{}", field.name)),
                    step_index: self.spec.steps.len(),
                    reference: field.source.to_string(),
                }
            })?;
            output.insert(field.name.clone(), field.ty.coerce(value));
        }
        Ok(output)
    }
}

/// Mutable state of one in-flight run.
struct Run<'a> {
    /// Running orchestration.
    orchestrator_id: &'a OrchestratorId,
    /// Current state machine position.
    status: RunStatus,
    /// Results of completed steps.
    context: ExecutionContext,
    /// Audit destination.
    audit: &'a dyn AuditSink,
}

impl Run<'_> {
    /// Marks the run failed at a step.
    fn fail(mut self, step_index: usize, step: &StepSpec, error: OrchestrationError) -> RunReport {
        self.status = RunStatus::FailedAtStep {
            step_index,
            step: step.name.clone(),
        };
        self.finish(Err(error))
    }

    /// Marks the run stopped at the current step boundary.
    fn interrupt(mut self, interruption: Interruption) -> RunReport {
        let completed_steps = self.context.len();
        let last_completed = self.context.last_completed().cloned();
        self.status = RunStatus::Cancelled {
            completed_steps,
        };
        let error = match interruption {
            Interruption::Cancelled => OrchestrationError::Cancelled {
                completed_steps,
                last_completed,
            },
            Interruption::DeadlineExceeded => OrchestrationError::DeadlineExceeded {
                completed_steps,
                last_completed,
            },
        };
        self.finish(Err(error))
    }

    /// Emits the terminal audit event and builds the report.
    fn finish(self, outcome: Result<Record, OrchestrationError>) -> RunReport {
        let status = match &outcome {
            Ok(_) => "succeeded",
            Err(error) => error.label(),
        };
        self.audit.record(&AuditEvent::RunFinished {
            timestamp_ms: now_ms(),
            orchestrator_id: self.orchestrator_id.clone(),
            status,
            completed_steps: self.context.len(),
        });
        RunReport {
            status: self.status,
            context: self.context,
            outcome,
        }
    }
}

// ============================================================================
// SECTION: Value Resolution
// ============================================================================

/// Builds the timeout failure for a step that overran its budget.
fn timed_out(step: &StepSpec, step_index: usize, budget_ms: u64) -> OrchestrationError {
    OrchestrationError::StepTimedOut {
        step: step.name.clone(),
        step_index,
        budget_ms,
    }
}

/// Builds a step's target input from its bindings.
fn bind_inputs(
    step: &StepSpec,
    step_index: usize,
    input: &Record,
    context: &ExecutionContext,
) -> Result<Record, OrchestrationError> {
    let mut record = Record::new();
    for binding in &step.inputs {
        let value = resolve_source(&binding.source, input, context).ok_or_else(|| {
            OrchestrationError::UnresolvedSource {
                step: step.name.clone(),
                step_index,
                reference: binding.source.to_string(),
            }
        })?;
        record.insert(binding.field.clone(), value);
    }
    Ok(record)
}

/// Reads a source from the input, the context, or the constant itself.
fn resolve_source(
    source: &ValueSource,
    input: &Record,
    context: &ExecutionContext,
) -> Option<Value> {
    match source {
        ValueSource::Input(field) => input.get(field.as_str()).cloned(),
        ValueSource::Step {
            step,
            path,
        } => {
            let value = context.get(step.as_str())?;
            match path {
                None => Some(value.clone()),
                Some(path) => value
                    .get_path(std::slice::from_ref(path.head()))?
                    .get_path(path.rest())
                    .cloned(),
            }
        }
        ValueSource::Constant(value) => Some(value.clone()),
    }
}
