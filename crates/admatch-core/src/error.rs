//! Error types for admatch-core

use crate::config::ValidationIssue;
use thiserror::Error;

/// Targeting engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Registration rejected because the descriptor violates an invariant
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Operation referenced an unknown matcher id
    #[error("matcher not found: {0}")]
    NotFound(String),

    /// Request context is missing fields the engine itself depends on
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Matcher exceeded its deadline
    #[error("matcher timed out after {0}ms")]
    Timeout(u64),

    /// Matcher invocation failed
    #[error("execution failed: {0}")]
    Execution(String),

    /// Batch configuration validation failed; every violation is collected
    #[error("configuration validation failed with {} issue(s)", .issues.len())]
    Validation {
        /// All violations found in the batch
        issues: Vec<ValidationIssue>,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
