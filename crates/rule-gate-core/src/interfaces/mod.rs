// crates/rule-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rule Gate Interfaces
// Description: Contract surface between the orchestrator and its targets.
// Purpose: Let orchestrations invoke tables and nested orchestrations through one seam.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The orchestrator never looks targets up itself; it asks a [`StepInvoker`].
//! The [`crate::Engine`] is the production invoker. Tests wrap it to count or
//! intercept invocations.

use crate::core::Record;
use crate::core::StepTarget;
use crate::core::Value;
use crate::runtime::RunControl;
use crate::runtime::StepFailure;

/// Invokes step targets on behalf of an orchestrator.
///
/// Implementations must complete one invocation before returning; the
/// orchestrator never has two invocations in flight within a run.
pub trait StepInvoker {
    /// Invokes `target` with a fully bound input record.
    ///
    /// # Errors
    ///
    /// Returns [`StepFailure`] when the target fails or cannot be found.
    fn invoke(
        &self,
        target: &StepTarget,
        input: &Record,
        control: &RunControl,
    ) -> Result<Value, StepFailure>;
}

impl<T: StepInvoker + ?Sized> StepInvoker for &T {
    fn invoke(
        &self,
        target: &StepTarget,
        input: &Record,
        control: &RunControl,
    ) -> Result<Value, StepFailure> {
        (**self).invoke(target, input, control)
    }
}
