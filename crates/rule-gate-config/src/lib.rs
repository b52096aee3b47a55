// crates/rule-gate-config/src/lib.rs
// ============================================================================
// Module: Rule Gate Config Library
// Description: Canonical config model and validation for rule-gate.toml.
// Purpose: Single source of truth for engine limits, deadlines, and audit.
// Dependencies: rule-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `rule-gate-config` defines the configuration model for the Rule Gate
//! engine. Loading is strict and fails closed: unknown keys, oversized files,
//! and out-of-range limits are rejected before any engine is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
