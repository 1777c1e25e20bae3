//! Matcher descriptors - identity and static metadata
//!
//! A [`MatcherDescriptor`] describes one registered matcher instance: its
//! stable id, scheduling parameters (priority, parallelism, deadlines), and
//! current lifecycle status. Descriptors are mutated only through explicit
//! registry operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Upper bound for a single matcher deadline, in milliseconds
pub const MAX_MATCHER_TIMEOUT_MS: u64 = 10_000;

/// Lifecycle status of a registered matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherStatus {
    /// Eligible for scheduling
    Active,
    /// Registered but skipped by the orchestrator
    Disabled,
    /// Auto-disabled after repeated execution failures
    Faulted,
}

impl MatcherStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Faulted => "faulted",
        }
    }
}

impl std::fmt::Display for MatcherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity and static metadata for one matcher instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherDescriptor {
    /// Unique matcher id, stable across hot reload of the same logical matcher
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Concrete implementation type, for debugging and health reporting
    pub type_name: String,
    /// Scheduling priority; lower value is evaluated earlier
    pub priority: i32,
    /// Whether the matcher participates in evaluation at all
    pub enabled: bool,
    /// Whether the matcher may run concurrently with peers of its tier
    pub can_run_in_parallel: bool,
    /// Per-invocation deadline in milliseconds
    pub timeout_ms: u64,
    /// Expected wall time in milliseconds; must not exceed `timeout_ms`
    pub expected_execution_time_ms: u64,
    /// Current lifecycle status, mutated only by the registry
    pub status: MatcherStatus,
    /// Informational tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl MatcherDescriptor {
    /// Create a descriptor with conservative defaults: priority 100,
    /// enabled, sequential, 1s deadline.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            type_name: name.clone(),
            name,
            priority: 100,
            enabled: true,
            can_run_in_parallel: false,
            timeout_ms: 1_000,
            expected_execution_time_ms: 100,
            status: MatcherStatus::Active,
            tags: BTreeSet::new(),
        }
    }

    /// Set the implementation type name
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Set the scheduling priority
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set enabled status
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Allow the matcher to run concurrently with its tier peers
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.can_run_in_parallel = parallel;
        self
    }

    /// Set the per-invocation deadline in milliseconds
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the expected execution time in milliseconds
    #[must_use]
    pub fn with_expected_ms(mut self, expected_ms: u64) -> Self {
        self.expected_execution_time_ms = expected_ms;
        self
    }

    /// Add an informational tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Whether the orchestrator should schedule this matcher
    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        self.enabled && self.status == MatcherStatus::Active
    }

    /// Re-check every descriptor invariant without mutating anything.
    ///
    /// Returns one message per violation; an empty list means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.id.trim().is_empty() {
            messages.push("id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            messages.push("name must not be empty".to_string());
        }
        if self.priority < 0 {
            messages.push(format!("priority must be >= 0, got {}", self.priority));
        }
        if self.timeout_ms == 0 {
            messages.push("timeout_ms must be > 0".to_string());
        } else if self.timeout_ms > MAX_MATCHER_TIMEOUT_MS {
            messages.push(format!(
                "timeout_ms must be <= {}, got {}",
                MAX_MATCHER_TIMEOUT_MS, self.timeout_ms
            ));
        }
        if self.expected_execution_time_ms == 0 {
            messages.push("expected_execution_time_ms must be > 0".to_string());
        } else if self.expected_execution_time_ms > self.timeout_ms {
            messages.push(format!(
                "expected_execution_time_ms ({}) must not exceed timeout_ms ({})",
                self.expected_execution_time_ms, self.timeout_ms
            ));
        }
        messages
    }
}
