// crates/rule-gate-config/src/config.rs
// ============================================================================
// Module: Rule Gate Configuration
// Description: Configuration loading and validation for the Rule Gate engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rule-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to the engine defaults, but any
//! key that is present must be known and in range. A loaded config yields the
//! [`EngineLimits`] for registration, the [`EngineConfig`] for runs, and the
//! configured audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rule_gate_core::AuditSink;
use rule_gate_core::Definitions;
use rule_gate_core::EngineConfig;
use rule_gate_core::EngineLimits;
use rule_gate_core::JsonlAuditSink;
use rule_gate_core::NoopAuditSink;
use rule_gate_core::StderrAuditSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rule-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RULE_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `limits.max_rules`.
pub const MAX_RULES_CEILING: usize = 65_536;
/// Upper bound for `limits.max_steps`.
pub const MAX_STEPS_CEILING: usize = 4096;
/// Upper bound for `limits.max_nesting_depth`.
pub const MAX_NESTING_DEPTH_CEILING: usize = 64;
/// Upper bound for `limits.max_condition_depth`.
pub const MAX_CONDITION_DEPTH_CEILING: usize = 256;
/// Upper bound for `limits.max_condition_nodes`.
pub const MAX_CONDITION_NODES_CEILING: usize = 65_536;
/// Upper bound for `run.deadline_ms` (one day).
pub const MAX_RUN_DEADLINE_MS: u64 = 24 * 60 * 60 * 1000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Rule Gate configuration loaded from `rule-gate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleGateConfig {
    /// Structural limits applied at registration.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Run execution settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl RuleGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins, then `RULE_GATE_CONFIG`, then `rule-gate.toml`
    /// in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.run.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the registration limits described by this config.
    #[must_use]
    pub const fn engine_limits(&self) -> EngineLimits {
        self.limits.to_engine_limits()
    }

    /// Returns the runtime configuration described by this config.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            run_deadline: self.run.deadline(),
        }
    }

    /// Returns an empty definition registry bound to the configured limits.
    #[must_use]
    pub fn definitions(&self) -> Definitions {
        Definitions::with_limits(self.engine_limits())
    }

    /// Opens the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit log file cannot be opened.
    pub fn open_audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        self.audit.open()
    }
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Structural limits section (`[limits]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum rules in one decision table.
    pub max_rules: usize,
    /// Maximum steps in one orchestration.
    pub max_steps: usize,
    /// Maximum orchestration nesting depth.
    pub max_nesting_depth: usize,
    /// Maximum nesting depth of a condition tree.
    pub max_condition_depth: usize,
    /// Maximum node count of a condition tree.
    pub max_condition_nodes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = EngineLimits::default();
        Self {
            max_rules: limits.max_rules,
            max_steps: limits.max_steps,
            max_nesting_depth: limits.max_nesting_depth,
            max_condition_depth: limits.max_condition_depth,
            max_condition_nodes: limits.max_condition_nodes,
        }
    }
}

impl LimitsConfig {
    /// Validates every limit against its hard ceiling.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit("limits.max_rules", self.max_rules, MAX_RULES_CEILING)?;
        validate_limit("limits.max_steps", self.max_steps, MAX_STEPS_CEILING)?;
        validate_limit("limits.max_nesting_depth", self.max_nesting_depth, MAX_NESTING_DEPTH_CEILING)?;
        validate_limit("limits.max_condition_depth", self.max_condition_depth, MAX_CONDITION_DEPTH_CEILING)?;
        validate_limit("limits.max_condition_nodes", self.max_condition_nodes, MAX_CONDITION_NODES_CEILING)
    }

    /// Converts the section into engine limits.
    const fn to_engine_limits(self) -> EngineLimits {
        EngineLimits {
            max_rules: self.max_rules,
            max_steps: self.max_steps,
            max_nesting_depth: self.max_nesting_depth,
            max_condition_depth: self.max_condition_depth,
            max_condition_nodes: self.max_condition_nodes,
        }
    }
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Run execution section (`[run]`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Wall-clock budget for one orchestration run, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl RunConfig {
    /// Validates the run deadline.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.deadline_ms {
            Some(0) => Err(ConfigError::Invalid("run.deadline_ms must be greater than zero".to_string())),
            Some(ms) if ms > MAX_RUN_DEADLINE_MS => {
                Err(ConfigError::Invalid(format!("run.deadline_ms must be at most {MAX_RUN_DEADLINE_MS}")))
            }
            _ => Ok(()),
        }
    }

    /// Returns the deadline as a duration.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        match self.deadline_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `audit.path`.
    Jsonl,
}

/// Audit section (`[audit]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Selected sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the `jsonl` sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::Jsonl, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::Jsonl, None) => {
                Err(ConfigError::Invalid("audit.path is required for the jsonl sink".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid("audit.path is only valid for the jsonl sink".to_string())),
            (_, None) => Ok(()),
        }
    }

    /// Opens the configured sink.
    fn open(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::Jsonl, Some(path)) => {
                let sink = JsonlAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::Jsonl, None) => {
                Err(ConfigError::Invalid("audit.path is required for the jsonl sink".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening a sink.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a limit lies in `1..=ceiling`.
fn validate_limit(field: &str, value: usize, ceiling: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if value > ceiling {
        return Err(ConfigError::Invalid(format!("{field} must be at most {ceiling}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("test_path", "   ");
        assert!(result.unwrap_err().to_string().contains("non-empty"));
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let path = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let result = validate_path_string("test_path", &path);
        assert!(result.unwrap_err().to_string().contains("component too long"));
    }

    #[test]
    fn validate_path_string_accepts_component_at_max() {
        let path = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH));
        assert!(validate_path_string("test_path", &path).is_ok());
    }

    #[test]
    fn validate_limit_accepts_the_ceiling() {
        assert!(validate_limit("limits.max_steps", MAX_STEPS_CEILING, MAX_STEPS_CEILING).is_ok());
        assert!(validate_limit("limits.max_steps", MAX_STEPS_CEILING + 1, MAX_STEPS_CEILING).is_err());
    }

    #[test]
    fn default_limits_match_the_engine() {
        assert_eq!(LimitsConfig::default().to_engine_limits(), EngineLimits::default());
    }
}
