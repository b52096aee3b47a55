// crates/rule-gate-core/src/runtime/control.rs
// ============================================================================
// Module: Run Control
// Description: Cooperative cancellation and deadlines for orchestration runs.
// Purpose: Stop runs cleanly at step boundaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`RunControl`] is consulted by the orchestrator before each step and
//! once more before projecting outputs. It is never consulted while a table
//! is being evaluated, so an interrupted run is always "completed through
//! step N" and never produces partial output. Nested runs share the caller's
//! cancellation flag; a step with its own time budget hands its target a
//! control narrowed with [`RunControl::within`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The cancel handle was triggered.
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

/// Cancellation flag and optional deadline for one or more runs.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    /// Shared cancellation flag.
    cancelled: Arc<AtomicBool>,
    /// Instant after which the run stops at the next boundary.
    deadline: Option<Instant>,
}

impl RunControl {
    /// Creates a control with no deadline that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        match deadline {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Returns a control sharing this cancellation flag whose deadline is
    /// the earlier of this deadline and `budget` from now.
    #[must_use]
    pub fn within(&self, budget: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(budget)) {
            (Some(current), Some(budget)) => Some(current.min(budget)),
            (current, budget) => current.or(budget),
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Returns a handle that cancels every run using this control.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns the reason to stop, if any. Cancellation wins over the deadline.
    #[must_use]
    pub fn interruption(&self) -> Option<Interruption> {
        if self.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Cloneable handle that requests cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    /// Shared cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation; takes effect at the next step boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
