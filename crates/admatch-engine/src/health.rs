//! Health reporter - registry and validation state as a pull-based signal
//!
//! Summarizes the current registry snapshot and a fresh validation pass
//! into the tri-state signal an external health-check transport polls. The
//! reporter reads through [`HealthSource`] so transports and tests can
//! substitute the registry.

use admatch_core::{MatcherDescriptor, MatcherRegistry, Result, ValidationReport};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Read-side contract the reporter checks against.
///
/// [`MatcherRegistry`] implements this infallibly; the fallible signatures
/// exist so wrappers (remote registries, instrumentation shims) can surface
/// their own failures as `Unhealthy`.
#[cfg_attr(test, mockall::automock)]
pub trait HealthSource: Send + Sync {
    /// Snapshot of every registered descriptor
    fn descriptors(&self) -> Result<Vec<MatcherDescriptor>>;

    /// Re-validate every descriptor without mutating state
    fn validate(&self) -> Result<Vec<ValidationReport>>;
}

impl HealthSource for MatcherRegistry {
    fn descriptors(&self) -> Result<Vec<MatcherDescriptor>> {
        Ok(self.get_all())
    }

    fn validate(&self) -> Result<Vec<ValidationReport>> {
        Ok(self.validate_all())
    }
}

/// Overall health signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Matchers available, no validation failures
    Healthy,
    /// Serving, but with no enabled matchers or with validation failures
    Degraded,
    /// Registry or validation could not be read
    Unhealthy,
}

impl HealthStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health snapshot handed to the external transport
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall signal
    pub status: HealthStatus,
    /// Registered matcher count
    pub total_matchers: usize,
    /// Enabled and active matcher count
    pub enabled_matchers: usize,
    /// Failure count from the validation pass
    pub validation_failures: usize,
    /// Free-form detail map for the transport to forward
    pub details: serde_json::Value,
}

/// Pull-based health reporter over a [`HealthSource`]
pub struct HealthReporter<S = MatcherRegistry> {
    source: Arc<S>,
}

impl<S: HealthSource> HealthReporter<S> {
    /// Create a reporter over the given source
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Produce a fresh health snapshot.
    ///
    /// Never fails: a source failure is reported as `Unhealthy` with the
    /// error in the detail map.
    #[must_use]
    pub fn check_health(&self) -> HealthReport {
        match self.snapshot() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "health source unavailable");
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    total_matchers: 0,
                    enabled_matchers: 0,
                    validation_failures: 0,
                    details: serde_json::json!({ "error": e.to_string() }),
                }
            }
        }
    }

    fn snapshot(&self) -> Result<HealthReport> {
        let descriptors = self.source.descriptors()?;
        let reports = self.source.validate()?;

        let total_matchers = descriptors.len();
        let enabled_matchers = descriptors.iter().filter(|d| d.is_schedulable()).count();
        let invalid: Vec<&str> = reports
            .iter()
            .filter(|r| !r.is_valid)
            .map(|r| r.matcher_id.as_str())
            .collect();
        let validation_failures = invalid.len();

        let status = if enabled_matchers == 0 || validation_failures > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Ok(HealthReport {
            status,
            total_matchers,
            enabled_matchers,
            validation_failures,
            details: serde_json::json!({
                "total_matchers": total_matchers,
                "enabled_matchers": enabled_matchers,
                "validation_failures": validation_failures,
                "invalid_matchers": invalid,
            }),
        })
    }
}
