//! Orchestrator types
//!
//! Contains the evaluation strategies, the aggregated decision returned for
//! every request, and the orchestrator configuration.

use admatch_core::{EngineOptions, MatchOutcome, MAX_MATCHER_TIMEOUT_MS};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// How per-matcher outcomes are folded into one decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// Stop scheduling further tiers as soon as one matcher matches
    FirstMatch,
    /// Every enabled matcher must match; timeouts and errors count as misses
    AllMatches {
        /// Stop scheduling further tiers after the first negative tier
        short_circuit: bool,
    },
    /// Only the earliest tier with a definitive outcome counts
    HighestPriority,
    /// Sum of scores (missing = 0) must meet the threshold; all tiers run
    WeightedEvaluation {
        /// Minimum score sum for an overall match
        threshold: f64,
    },
}

impl EvaluationStrategy {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstMatch => "first_match",
            Self::AllMatches { .. } => "all_matches",
            Self::HighestPriority => "highest_priority",
            Self::WeightedEvaluation { .. } => "weighted_evaluation",
        }
    }
}

impl std::fmt::Display for EvaluationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final per-request targeting verdict plus the full diagnostic trail.
///
/// Always returned, even under partial matcher failure; callers read
/// `any_skipped` and the per-outcome error fields instead of expecting
/// errors for matcher-level problems.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedDecision {
    /// Correlation id for this evaluation run
    pub evaluation_id: Uuid,
    /// Overall verdict under the chosen strategy
    pub matched: bool,
    /// Per-matcher outcomes in ascending tier order
    pub outcomes: Vec<MatchOutcome>,
    /// Strategy that governed aggregation
    pub strategy: EvaluationStrategy,
    /// Total wall time of the evaluation, milliseconds
    pub elapsed_ms: u64,
    /// Whether any matcher was skipped or degraded (timeout, error, cancellation)
    pub any_skipped: bool,
    /// Set when the enabled matcher set was empty: degraded, not an error
    pub no_matchers_available: bool,
}

impl AggregatedDecision {
    /// Degraded-but-successful decision for an empty enabled set
    #[must_use]
    pub fn no_matchers(evaluation_id: Uuid, strategy: EvaluationStrategy, elapsed_ms: u64) -> Self {
        Self {
            evaluation_id,
            matched: false,
            outcomes: Vec::new(),
            strategy,
            elapsed_ms,
            any_skipped: false,
            no_matchers_available: true,
        }
    }

    /// Outcome for a specific matcher, if it was scheduled
    #[must_use]
    pub fn outcome_for(&self, matcher_id: &str) -> Option<&MatchOutcome> {
        self.outcomes.iter().find(|o| o.matcher_id == matcher_id)
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard cap applied over descriptor deadlines
    pub max_timeout: Duration,
    /// Log per-outcome durations at debug level
    pub performance_monitoring: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_timeout: Duration::from_millis(MAX_MATCHER_TIMEOUT_MS),
            performance_monitoring: false,
        }
    }
}

impl OrchestratorConfig {
    /// Derive orchestrator settings from the global engine options
    #[must_use]
    pub fn from_engine_options(options: &EngineOptions) -> Self {
        Self {
            performance_monitoring: options.enable_performance_monitoring,
            ..Self::default()
        }
    }

    /// Set the hard deadline cap
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    /// Enable or disable per-outcome duration logging
    #[must_use]
    pub fn with_performance_monitoring(mut self, enabled: bool) -> Self {
        self.performance_monitoring = enabled;
        self
    }
}
