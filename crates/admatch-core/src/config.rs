//! Configuration schema and batch validation
//!
//! The engine never reads files or environment variables; an external
//! loader binds some source into [`EngineConfig`] and hands it over. This
//! module only defines the typed schema and the fail-soft validation pass
//! that collects every violation before the bootstrapper decides between
//! fail-fast and continue-on-error.

use crate::descriptor::{MatcherDescriptor, MAX_MATCHER_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Upper bound for the global default timeout, in milliseconds
pub const MAX_DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Instantiation lifetime of a matcher component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherLifetime {
    /// One instance for the process lifetime
    #[default]
    Singleton,
    /// One instance per request scope
    Scoped,
    /// Fresh instance per resolution
    Transient,
}

impl MatcherLifetime {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        }
    }
}

impl FromStr for MatcherLifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "scoped" => Ok(Self::Scoped),
            "transient" => Ok(Self::Transient),
            other => Err(format!("unknown lifetime: {other}")),
        }
    }
}

/// Per-matcher configuration block.
///
/// `timeout_ms` and `lifetime` fall back to the global defaults in
/// [`EngineOptions`] when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfiguration {
    /// Whether the matcher participates in evaluation
    pub enabled: bool,
    /// Scheduling priority; lower value runs earlier
    pub priority: i32,
    /// Component lifetime; `None` uses `default_lifetime`
    pub lifetime: Option<MatcherLifetime>,
    /// Whether the matcher may run concurrently with its tier peers
    pub can_run_in_parallel: bool,
    /// Expected wall time per invocation, milliseconds
    pub expected_execution_time_ms: u64,
    /// Deadline per invocation, milliseconds; `None` uses `default_timeout_ms`
    pub timeout_ms: Option<u64>,
    /// Matcher-specific extras, validated by the matcher itself
    pub parameters: HashMap<String, serde_json::Value>,
}

impl Default for MatcherConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 100,
            lifetime: None,
            can_run_in_parallel: false,
            expected_execution_time_ms: 100,
            timeout_ms: None,
            parameters: HashMap::new(),
        }
    }
}

impl MatcherConfiguration {
    /// Deadline for this matcher after applying the global default
    #[must_use]
    pub fn effective_timeout_ms(&self, options: &EngineOptions) -> u64 {
        self.timeout_ms.unwrap_or(options.default_timeout_ms)
    }

    /// Lifetime for this matcher after applying the global default
    #[must_use]
    pub fn effective_lifetime(&self, options: &EngineOptions) -> MatcherLifetime {
        self.lifetime.unwrap_or(options.default_lifetime)
    }

    /// Build the descriptor the bootstrapper registers for this block
    #[must_use]
    pub fn to_descriptor(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
        options: &EngineOptions,
    ) -> MatcherDescriptor {
        MatcherDescriptor::new(id, name)
            .with_type_name(type_name)
            .with_priority(self.priority)
            .with_enabled(self.enabled)
            .with_parallel(self.can_run_in_parallel)
            .with_timeout_ms(self.effective_timeout_ms(options))
            .with_expected_ms(self.expected_execution_time_ms)
    }
}

/// Global engine options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Fallback deadline for matchers without an explicit timeout, milliseconds
    pub default_timeout_ms: u64,
    /// Fallback component lifetime
    pub default_lifetime: MatcherLifetime,
    /// Accepted but currently inert; reserved for a future caching layer
    pub enable_caching: bool,
    /// Emit per-outcome duration logs from the orchestrator
    pub enable_performance_monitoring: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            default_lifetime: MatcherLifetime::Singleton,
            enable_caching: false,
            enable_performance_monitoring: false,
        }
    }
}

/// Full configuration blob handed over by the external loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global options
    pub options: EngineOptions,
    /// Per-matcher blocks, keyed by matcher id
    pub matchers: BTreeMap<String, MatcherConfiguration>,
}

/// One configuration violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Offending matcher id; `None` for global options
    pub matcher_id: Option<String>,
    /// Offending field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationIssue {
    fn global(field: &str, message: impl Into<String>) -> Self {
        Self {
            matcher_id: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn matcher(id: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            matcher_id: Some(id.to_string()),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.matcher_id {
            Some(id) => write!(f, "{}.{}: {}", id, self.field, self.message),
            None => write!(f, "options.{}: {}", self.field, self.message),
        }
    }
}

impl EngineConfig {
    /// Validate the whole batch, collecting every violation.
    ///
    /// Never mutates anything; the caller decides what a non-empty list
    /// means (fail-fast bootstrap vs degraded continue).
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.options.default_timeout_ms == 0 {
            issues.push(ValidationIssue::global("default_timeout_ms", "must be > 0"));
        } else if self.options.default_timeout_ms > MAX_DEFAULT_TIMEOUT_MS {
            issues.push(ValidationIssue::global(
                "default_timeout_ms",
                format!(
                    "must be <= {}, got {}",
                    MAX_DEFAULT_TIMEOUT_MS, self.options.default_timeout_ms
                ),
            ));
        }

        for (id, matcher) in &self.matchers {
            if matcher.priority < 0 {
                issues.push(ValidationIssue::matcher(
                    id,
                    "priority",
                    format!("must be >= 0, got {}", matcher.priority),
                ));
            }
            if matcher.expected_execution_time_ms == 0 {
                issues.push(ValidationIssue::matcher(
                    id,
                    "expected_execution_time_ms",
                    "must be > 0",
                ));
            }
            if let Some(timeout_ms) = matcher.timeout_ms {
                if timeout_ms == 0 {
                    issues.push(ValidationIssue::matcher(id, "timeout_ms", "must be > 0"));
                } else if timeout_ms > MAX_MATCHER_TIMEOUT_MS {
                    issues.push(ValidationIssue::matcher(
                        id,
                        "timeout_ms",
                        format!("must be <= {}, got {}", MAX_MATCHER_TIMEOUT_MS, timeout_ms),
                    ));
                }
            }
            let effective = matcher.effective_timeout_ms(&self.options);
            if effective > 0 && matcher.expected_execution_time_ms > effective {
                issues.push(ValidationIssue::matcher(
                    id,
                    "expected_execution_time_ms",
                    format!(
                        "{} must not exceed the effective timeout ({})",
                        matcher.expected_execution_time_ms, effective
                    ),
                ));
            }
        }

        issues
    }

    /// Fail-fast variant for bootstrappers that refuse degraded startup
    pub fn validate_strict(&self) -> crate::error::Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(crate::error::Error::Validation { issues })
        }
    }
}
