//! Matcher capability contract
//!
//! This module defines what a pluggable targeting matcher looks like to the
//! engine: an async callable taking a [`MatchRequestContext`] and producing
//! a [`MatchOutcome`], plus static metadata in the form of a descriptor.
//! Concrete matcher business logic lives outside this workspace.

use crate::descriptor::MatcherDescriptor;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Per-request input, immutable for the duration of one orchestration run.
///
/// The engine itself only depends on `request_id` and `candidate_ad_id`;
/// everything in `signals` is opaque payload for the matchers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRequestContext {
    /// Request identifier, required by the engine
    pub request_id: String,
    /// Advertisement candidate under evaluation, required by the engine
    pub candidate_ad_id: String,
    /// User/device signals forwarded by the gateway, opaque to the engine
    pub signals: HashMap<String, serde_json::Value>,
    /// When the request entered the system
    pub received_at: DateTime<Utc>,
}

impl MatchRequestContext {
    /// Create a context for one ad candidate
    #[must_use]
    pub fn new(request_id: impl Into<String>, candidate_ad_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            candidate_ad_id: candidate_ad_id.into(),
            signals: HashMap::new(),
            received_at: Utc::now(),
        }
    }

    /// Attach a signal value
    #[must_use]
    pub fn with_signal(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.signals.insert(key.into(), value);
        self
    }

    /// Check the fields the engine itself depends on.
    ///
    /// A malformed context is a fatal error for the whole evaluation, unlike
    /// per-matcher failures which are absorbed into outcomes.
    pub fn validate(&self) -> Result<()> {
        if self.request_id.trim().is_empty() {
            return Err(Error::InvalidRequest("request_id is required".to_string()));
        }
        if self.candidate_ad_id.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "candidate_ad_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-matcher result of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    /// Id of the matcher that produced this outcome
    pub matcher_id: String,
    /// Whether the candidate qualified
    pub matched: bool,
    /// Optional numeric score for weighted aggregation
    pub score: Option<f64>,
    /// Invocation wall time in milliseconds
    pub duration_ms: u64,
    /// Error message, present on timeout or execution failure
    pub error: Option<String>,
    /// Whether the matcher exceeded its deadline
    pub timed_out: bool,
}

impl MatchOutcome {
    /// Positive outcome
    #[must_use]
    pub fn matched(matcher_id: impl Into<String>) -> Self {
        Self {
            matcher_id: matcher_id.into(),
            matched: true,
            score: None,
            duration_ms: 0,
            error: None,
            timed_out: false,
        }
    }

    /// Negative outcome
    #[must_use]
    pub fn not_matched(matcher_id: impl Into<String>) -> Self {
        Self {
            matched: false,
            ..Self::matched(matcher_id)
        }
    }

    /// Attach a score for weighted aggregation
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Outcome for a failed invocation
    #[must_use]
    pub fn failure(matcher_id: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            matcher_id: matcher_id.into(),
            matched: false,
            score: None,
            duration_ms,
            error: Some(error.into()),
            timed_out: false,
        }
    }

    /// Outcome for an invocation that exceeded its deadline
    #[must_use]
    pub fn timed_out(matcher_id: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            matcher_id: matcher_id.into(),
            matched: false,
            score: None,
            duration_ms: timeout_ms,
            error: Some(format!("timed out after {timeout_ms}ms")),
            timed_out: true,
        }
    }

    /// Definitive means the matcher actually answered: no error, no timeout.
    #[must_use]
    pub fn is_definitive(&self) -> bool {
        self.error.is_none() && !self.timed_out
    }
}

/// Trait for matcher implementations.
///
/// Matchers arrive as already-instantiated, named components; the registry
/// holds them behind `Arc<dyn Matcher>`. They must not touch engine state;
/// any I/O they perform is an opaque call bounded by the descriptor timeout.
#[async_trait::async_trait]
pub trait Matcher: Send + Sync {
    /// Static metadata for this matcher
    fn descriptor(&self) -> &MatcherDescriptor;

    /// Evaluate one request context.
    ///
    /// The orchestrator stamps the authoritative `matcher_id` and
    /// `duration_ms` on the returned outcome.
    async fn evaluate(&self, context: &MatchRequestContext) -> Result<MatchOutcome>;
}
