// crates/rule-gate-core/src/core/orchestration.rs
// ============================================================================
// Module: Orchestration Specifications
// Description: Steps, input bindings, gates, and output projections.
// Purpose: Define orchestrations and check their static consistency eagerly.
// Dependencies: crate::core::{definition, identifiers, limits, predicate, table, value}, rule-logic, serde
// ============================================================================

//! ## Overview
//! An orchestration runs its steps in declared order. Each step binds every
//! input field of its target (a decision table or a nested orchestration)
//! from the orchestration input, an earlier step's result, or a constant. A
//! step may carry a gate, checked against the context right after the step.
//! Outputs project the final context and input into a record.
//!
//! [`OrchestratorSpec::validate`] proves, before any run, that every source
//! resolves, every reference points backwards, and every type lines up.
//! Targets must already be registered, so nesting is acyclic by construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rule_logic::Requirement;
use serde::Deserialize;
use serde::Serialize;

use crate::core::definition::DefinitionError;
use crate::core::identifiers::FieldName;
use crate::core::identifiers::OrchestratorId;
use crate::core::identifiers::StepName;
use crate::core::identifiers::TableId;
use crate::core::limits::EngineLimits;
use crate::core::predicate::FieldPath;
use crate::core::predicate::FieldPredicate;
use crate::core::table::ensure_predicates_typed;
use crate::core::value::RecordShape;
use crate::core::value::Value;
use crate::core::value::ValueType;

// ============================================================================
// SECTION: Orchestration Specification
// ============================================================================

/// Declarative orchestration definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSpec {
    /// Orchestration identifier.
    pub orchestrator_id: OrchestratorId,
    /// Declared input shape.
    pub input: RecordShape,
    /// Steps in execution order.
    pub steps: Vec<StepSpec>,
    /// Output fields, in declaration order.
    pub outputs: Vec<OutputField>,
}

/// One orchestration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step name, also its context key.
    pub name: StepName,
    /// Invocation target.
    pub target: StepTarget,
    /// Bindings for every target input field.
    pub inputs: Vec<InputBinding>,
    /// Optional gate evaluated against the context after this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Requirement<FieldPredicate>>,
    /// Message reported when the gate fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_message: Option<String>,
    /// Time budget for the step in milliseconds, checked at step boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl StepSpec {
    /// Builds an ungated step without a time budget.
    #[must_use]
    pub fn new(name: impl Into<StepName>, target: StepTarget, inputs: Vec<InputBinding>) -> Self {
        Self {
            name: name.into(),
            target,
            inputs,
            gate: None,
            gate_message: None,
            timeout_ms: None,
        }
    }

    /// Gates the step on `condition`.
    #[must_use]
    pub fn gated(mut self, condition: Requirement<FieldPredicate>) -> Self {
        self.gate = Some(condition);
        self
    }

    /// Sets the message reported when the gate fails.
    #[must_use]
    pub fn with_gate_message(mut self, message: impl Into<String>) -> Self {
        self.gate_message = Some(message.into());
        self
    }

    /// Sets the step's time budget in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// What a step invokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTarget {
    /// A registered decision table.
    Table(TableId),
    /// A registered orchestration.
    Orchestrator(OrchestratorId),
}

impl fmt::Display for StepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(id) => write!(f, "table `{id}`"),
            Self::Orchestrator(id) => write!(f, "orchestrator `{id}`"),
        }
    }
}

/// Binding of one target input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    /// Target input field.
    pub field: FieldName,
    /// Where the value comes from.
    pub source: ValueSource,
}

impl InputBinding {
    /// Binds `field` to `source`.
    #[must_use]
    pub fn new(field: impl Into<FieldName>, source: ValueSource) -> Self {
        Self {
            field: field.into(),
            source,
        }
    }

    /// Binds `field` to the orchestration input field of the same name.
    #[must_use]
    pub fn from_input(field: impl Into<FieldName>) -> Self {
        let field = field.into();
        Self {
            source: ValueSource::Input(field.clone()),
            field,
        }
    }
}

/// One output field of an orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    /// Output field name.
    pub name: FieldName,
    /// Declared output type.
    #[serde(rename = "type")]
    pub ty: ValueType,
    /// Where the value comes from.
    pub source: ValueSource,
}

/// Origin of a bound or projected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// A field of the orchestration input.
    Input(FieldName),
    /// An earlier step's result, optionally a field inside it.
    Step {
        /// Producing step.
        step: StepName,
        /// Path inside the step's record result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<FieldPath>,
    },
    /// A fixed value.
    Constant(Value),
}

impl ValueSource {
    /// Reads a whole step result.
    #[must_use]
    pub fn step(step: impl Into<StepName>) -> Self {
        Self::Step {
            step: step.into(),
            path: None,
        }
    }

    /// Reads a field inside a step's record result.
    #[must_use]
    pub fn step_field(step: impl Into<StepName>, path: FieldPath) -> Self {
        Self::Step {
            step: step.into(),
            path: Some(path),
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(field) => write!(f, "input.{field}"),
            Self::Step {
                step,
                path: None,
            } => write!(f, "{step}"),
            Self::Step {
                step,
                path: Some(path),
            } => write!(f, "{step}.{path}"),
            Self::Constant(value) => write!(f, "{value}"),
        }
    }
}

// ============================================================================
// SECTION: Target Catalog
// ============================================================================

/// Input and output types of an invocation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSignature {
    /// Declared input shape.
    pub input: RecordShape,
    /// Result type.
    pub output: ValueType,
    /// Orchestration nesting depth; tables are 0.
    pub nesting_depth: usize,
}

/// Lookup of registered targets used during orchestration validation.
pub trait TargetCatalog {
    /// Returns the signature of a registered target.
    fn signature(&self, target: &StepTarget) -> Option<TargetSignature>;
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Facts established by a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrchestration {
    /// Shape of the projected output record.
    pub output_shape: RecordShape,
    /// Nesting depth of this orchestration (1 when it only calls tables).
    pub nesting_depth: usize,
    /// Result type of each step's target, in step order.
    pub step_outputs: Vec<ValueType>,
}

impl OrchestratorSpec {
    /// Returns the output record shape declared by `outputs`.
    #[must_use]
    pub fn output_shape(&self) -> RecordShape {
        self.outputs.iter().fold(RecordShape::new(), |shape, output| {
            shape.field(output.name.clone(), output.ty.clone())
        })
    }

    /// Validates the orchestration against the registered targets.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] for the first static inconsistency found.
    pub fn validate(
        &self,
        catalog: &dyn TargetCatalog,
        limits: &EngineLimits,
    ) -> Result<ValidatedOrchestration, DefinitionError> {
        let orchestrator = &self.orchestrator_id;
        if self.steps.is_empty() {
            return Err(DefinitionError::EmptyOrchestrator {
                orchestrator: orchestrator.clone(),
            });
        }
        if self.steps.len() > limits.max_steps {
            return Err(DefinitionError::TooManySteps {
                orchestrator: orchestrator.clone(),
                count: self.steps.len(),
                max: limits.max_steps,
            });
        }
        if let Some(defect) = self.input.defect() {
            return Err(DefinitionError::shape(format!("orchestrator `{orchestrator}` input"), defect));
        }

        let mut produced: Vec<(&StepName, ValueType)> = Vec::with_capacity(self.steps.len());
        let mut nesting_depth = 1;
        for (index, step) in self.steps.iter().enumerate() {
            if !step.name.is_identifier() {
                return Err(DefinitionError::InvalidStepName {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                });
            }
            if produced.iter().any(|(name, _)| **name == step.name) {
                return Err(DefinitionError::DuplicateStep {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                });
            }
            if step.timeout_ms == Some(0) {
                return Err(DefinitionError::ZeroStepBudget {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                });
            }
            if step.gate.is_none() && step.gate_message.is_some() {
                return Err(DefinitionError::GateMessageWithoutGate {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                });
            }
            let Some(signature) = catalog.signature(&step.target) else {
                return Err(DefinitionError::UnknownTarget {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                    target: step.target.to_string(),
                });
            };
            nesting_depth = nesting_depth.max(signature.nesting_depth + 1);
            if nesting_depth > limits.max_nesting_depth {
                return Err(DefinitionError::NestingTooDeep {
                    orchestrator: orchestrator.clone(),
                    depth: nesting_depth,
                    max: limits.max_nesting_depth,
                });
            }

            self.ensure_bindings(step, &signature.input, &produced, index)?;
            produced.push((&step.name, signature.output));

            if let Some(gate) = &step.gate {
                self.ensure_gate(step, gate, &produced, index, limits)?;
            }
        }

        self.ensure_outputs(&produced)?;
        let output_shape = self.output_shape();
        if let Some(defect) = output_shape.defect() {
            return Err(DefinitionError::shape(format!("orchestrator `{orchestrator}` output"), defect));
        }

        Ok(ValidatedOrchestration {
            output_shape,
            nesting_depth,
            step_outputs: produced.into_iter().map(|(_, ty)| ty).collect(),
        })
    }

    /// Ensures a step binds each target field exactly once from a resolvable, assignable source.
    fn ensure_bindings(
        &self,
        step: &StepSpec,
        target_input: &RecordShape,
        produced: &[(&StepName, ValueType)],
        index: usize,
    ) -> Result<(), DefinitionError> {
        let orchestrator = &self.orchestrator_id;
        for (position, binding) in step.inputs.iter().enumerate() {
            let Some(expected) = target_input.field_type(binding.field.as_str()) else {
                return Err(DefinitionError::UnknownBindingField {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                    field: binding.field.clone(),
                });
            };
            if step.inputs[.. position].iter().any(|other| other.field == binding.field) {
                return Err(DefinitionError::DuplicateBinding {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                    field: binding.field.clone(),
                });
            }
            let owner = format!("step `{}` field `{}`", step.name, binding.field);
            let found = self.source_type(&binding.source, &owner, produced, index)?;
            ensure_assignable(orchestrator, &owner, expected, &found)?;
        }
        for field in target_input.fields() {
            if !step.inputs.iter().any(|binding| binding.field == field.name) {
                return Err(DefinitionError::MissingBinding {
                    orchestrator: orchestrator.clone(),
                    step: step.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Ensures a gate only reads the current or earlier steps and type-checks.
    fn ensure_gate(
        &self,
        step: &StepSpec,
        gate: &Requirement<FieldPredicate>,
        produced: &[(&StepName, ValueType)],
        index: usize,
        limits: &EngineLimits,
    ) -> Result<(), DefinitionError> {
        let owner = format!("gate of step `{}`", step.name);
        limits.condition_validator().validate(gate).map_err(|source| {
            DefinitionError::ConditionTooComplex {
                owner: format!("{owner} in `{}`", self.orchestrator_id),
                source,
            }
        })?;
        for predicate in gate.predicates() {
            let head = StepName::new(predicate.path().head().as_str());
            self.step_type(&head, &owner, produced, index + 1)?;
        }
        ensure_predicates_typed(gate, &format!("{owner} in `{}`", self.orchestrator_id), |path| {
            produced
                .iter()
                .find(|(name, _)| name.as_str() == path.head().as_str())
                .and_then(|(_, ty)| ty.resolve_path(path.rest()))
        })
    }

    /// Ensures output names are unique and every output resolves to an assignable source.
    fn ensure_outputs(&self, produced: &[(&StepName, ValueType)]) -> Result<(), DefinitionError> {
        let orchestrator = &self.orchestrator_id;
        for (position, output) in self.outputs.iter().enumerate() {
            if self.outputs[.. position].iter().any(|other| other.name == output.name) {
                return Err(DefinitionError::DuplicateOutput {
                    orchestrator: orchestrator.clone(),
                    field: output.name.clone(),
                });
            }
            let owner = format!("output `{}`", output.name);
            let found = self.source_type(&output.source, &owner, produced, self.steps.len())?;
            ensure_assignable(orchestrator, &owner, &output.ty, &found)?;
        }
        Ok(())
    }

    /// Resolves the static type of a value source.
    ///
    /// Only the first `visible` steps may be read.
    fn source_type(
        &self,
        source: &ValueSource,
        owner: &str,
        produced: &[(&StepName, ValueType)],
        visible: usize,
    ) -> Result<ValueType, DefinitionError> {
        match source {
            ValueSource::Input(field) => self.input.field_type(field.as_str()).cloned().ok_or_else(|| {
                DefinitionError::UnknownInputField {
                    orchestrator: self.orchestrator_id.clone(),
                    owner: owner.to_string(),
                    field: field.clone(),
                }
            }),
            ValueSource::Step {
                step,
                path,
            } => {
                let ty = self.step_type(step, owner, produced, visible)?;
                let Some(path) = path else {
                    return Ok(ty.clone());
                };
                ty.resolve_path(std::slice::from_ref(path.head()))
                    .and_then(|inner| inner.resolve_path(path.rest()))
                    .cloned()
                    .ok_or_else(|| DefinitionError::InvalidStepPath {
                        orchestrator: self.orchestrator_id.clone(),
                        owner: owner.to_string(),
                        step: step.clone(),
                        path: path.to_string(),
                    })
            }
            ValueSource::Constant(value) => Ok(ValueType::of(value)),
        }
    }

    /// Returns the result type of `step` when it is among the first `visible` steps.
    fn step_type<'p>(
        &self,
        step: &StepName,
        owner: &str,
        produced: &'p [(&StepName, ValueType)],
        visible: usize,
    ) -> Result<&'p ValueType, DefinitionError> {
        if let Some((_, ty)) = produced.iter().take(visible).find(|(name, _)| *name == step) {
            return Ok(ty);
        }
        if self.steps.iter().any(|declared| declared.name == *step) {
            return Err(DefinitionError::ForwardStepReference {
                orchestrator: self.orchestrator_id.clone(),
                owner: owner.to_string(),
                step: step.clone(),
            });
        }
        Err(DefinitionError::UnknownStepReference {
            orchestrator: self.orchestrator_id.clone(),
            owner: owner.to_string(),
            step: step.clone(),
        })
    }
}

/// Ensures a source type may be stored in a destination type.
fn ensure_assignable(
    orchestrator: &OrchestratorId,
    owner: &str,
    expected: &ValueType,
    found: &ValueType,
) -> Result<(), DefinitionError> {
    if expected.accepts_type(found) {
        Ok(())
    } else {
        Err(DefinitionError::SourceTypeMismatch {
            orchestrator: orchestrator.clone(),
            owner: owner.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
