// crates/rule-gate-core/src/runtime/registry.rs
// ============================================================================
// Module: Definition Registry
// Description: Immutable, validated tables and orchestrations keyed by id.
// Purpose: Validate definitions once at load time and share them across runs.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Definitions are registered bottom-up: tables first, then orchestrations
//! that reference them, then orchestrations that nest those. Every addition
//! is validated against what is already registered, so a reference can only
//! point backwards and nesting is acyclic by construction. Registered
//! definitions are held behind [`Arc`] and never mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::DecisionTable;
use crate::core::DecisionTableSpec;
use crate::core::DefinitionError;
use crate::core::EngineLimits;
use crate::core::OrchestratorId;
use crate::core::OrchestratorSpec;
use crate::core::StepTarget;
use crate::core::TableId;
use crate::core::TargetCatalog;
use crate::core::TargetSignature;
use crate::runtime::orchestrator::Orchestrator;

/// Registered tables and orchestrations.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// Tables keyed by identifier.
    tables: BTreeMap<TableId, Arc<DecisionTable>>,
    /// Orchestrations keyed by identifier.
    orchestrators: BTreeMap<OrchestratorId, Arc<Orchestrator>>,
    /// Limits applied to every registration.
    limits: EngineLimits,
}

impl Definitions {
    /// Creates an empty registry with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with explicit limits.
    #[must_use]
    pub fn with_limits(limits: EngineLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Returns the limits applied to registrations.
    #[must_use]
    pub const fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Validates and registers a decision table.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::DuplicateTable`] when the id is taken, or the
    /// table's own validation error.
    pub fn add_table(&mut self, spec: DecisionTableSpec) -> Result<Arc<DecisionTable>, DefinitionError> {
        if self.tables.contains_key(&spec.table_id) {
            return Err(DefinitionError::DuplicateTable(spec.table_id));
        }
        let table = Arc::new(DecisionTable::with_limits(spec, &self.limits)?);
        self.tables.insert(table.table_id().clone(), Arc::clone(&table));
        Ok(table)
    }

    /// Validates and registers an orchestration.
    ///
    /// Every target the orchestration references must already be registered.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::DuplicateOrchestrator`] when the id is taken,
    /// or the first static inconsistency in the definition.
    pub fn add_orchestrator(
        &mut self,
        spec: OrchestratorSpec,
    ) -> Result<Arc<Orchestrator>, DefinitionError> {
        if self.orchestrators.contains_key(&spec.orchestrator_id) {
            return Err(DefinitionError::DuplicateOrchestrator(spec.orchestrator_id));
        }
        let orchestrator = Arc::new(Orchestrator::new(spec, self, &self.limits)?);
        self.orchestrators.insert(orchestrator.orchestrator_id().clone(), Arc::clone(&orchestrator));
        Ok(orchestrator)
    }

    /// Returns a registered table.
    #[must_use]
    pub fn table(&self, table_id: &TableId) -> Option<&Arc<DecisionTable>> {
        self.tables.get(table_id)
    }

    /// Returns a registered orchestration.
    #[must_use]
    pub fn orchestrator(&self, orchestrator_id: &OrchestratorId) -> Option<&Arc<Orchestrator>> {
        self.orchestrators.get(orchestrator_id)
    }
}

impl TargetCatalog for Definitions {
    fn signature(&self, target: &StepTarget) -> Option<TargetSignature> {
        match target {
            StepTarget::Table(table_id) => {
                let table = self.tables.get(table_id)?;
                Some(TargetSignature {
                    input: table.input_shape().clone(),
                    output: table.output_type().clone(),
                    nesting_depth: 0,
                })
            }
            StepTarget::Orchestrator(orchestrator_id) => {
                self.orchestrators.get(orchestrator_id).map(|orchestrator| orchestrator.signature())
            }
        }
    }
}

