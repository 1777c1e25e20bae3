use crate::descriptor::MatcherStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events emitted on registry mutation.
///
/// Payloads carry descriptor identity only, never the matcher handle;
/// subscribers that need the full descriptor fetch it from the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A matcher was added or atomically replaced
    Registered {
        /// Matcher id
        matcher_id: String,
        /// Human-readable name
        name: String,
        /// Concrete implementation type
        type_name: String,
        /// Scheduling priority
        priority: i32,
        /// Who handed the matcher to the registry (free text)
        source: String,
        /// Whether this happened while serving traffic
        is_hot: bool,
        /// When the mutation was applied
        timestamp: DateTime<Utc>,
    },
    /// A matcher was removed
    Unregistered {
        /// Matcher id
        matcher_id: String,
        /// Optional free-text reason
        reason: Option<String>,
        /// Whether this happened while serving traffic
        is_hot: bool,
        /// When the mutation was applied
        timestamp: DateTime<Utc>,
    },
    /// A matcher's lifecycle status changed
    StatusChanged {
        /// Matcher id
        matcher_id: String,
        /// Status before the transition
        old_status: MatcherStatus,
        /// Status after the transition
        new_status: MatcherStatus,
        /// Optional reason or error message
        reason: Option<String>,
        /// When the mutation was applied
        timestamp: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    /// Get the matcher id from any event variant
    #[must_use]
    pub fn matcher_id(&self) -> &str {
        match self {
            Self::Registered { matcher_id, .. }
            | Self::Unregistered { matcher_id, .. }
            | Self::StatusChanged { matcher_id, .. } => matcher_id,
        }
    }
}
