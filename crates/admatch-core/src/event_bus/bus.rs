use super::types::LifecycleEvent;
use crate::descriptor::{MatcherDescriptor, MatcherStatus};
use chrono::Utc;
use tokio::sync::broadcast;

/// Per-subscriber buffer depth before lag sets in
pub const DEFAULT_EVENT_BUFFER: usize = 128;

/// Fan-out channel for registry lifecycle announcements.
///
/// The registry is the single publisher; every subscriber holds an
/// independent cursor into a bounded broadcast buffer. A subscriber that
/// falls more than the buffer depth behind skips ahead (`Lagged`) instead
/// of applying backpressure to the registry write that triggered the
/// announcement. The announce side stamps timestamps itself, so an event's
/// timestamp always reflects when the mutation was applied.
#[derive(Debug, Clone)]
pub struct LifecycleEventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleEventBus {
    /// Bus with a custom per-subscriber buffer depth
    #[must_use]
    pub fn with_buffer(depth: usize) -> Self {
        let (sender, _) = broadcast::channel(depth.max(1));
        Self { sender }
    }

    /// Open an independent stream starting at the next announcement
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Number of currently attached subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Announce an added or atomically replaced matcher
    pub(crate) fn announce_registered(
        &self,
        descriptor: &MatcherDescriptor,
        source: String,
        is_hot: bool,
    ) -> usize {
        self.announce(LifecycleEvent::Registered {
            matcher_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            type_name: descriptor.type_name.clone(),
            priority: descriptor.priority,
            source,
            is_hot,
            timestamp: Utc::now(),
        })
    }

    /// Announce a removed matcher
    pub(crate) fn announce_unregistered(
        &self,
        matcher_id: &str,
        reason: Option<String>,
        is_hot: bool,
    ) -> usize {
        self.announce(LifecycleEvent::Unregistered {
            matcher_id: matcher_id.to_string(),
            reason,
            is_hot,
            timestamp: Utc::now(),
        })
    }

    /// Announce a lifecycle status transition
    pub(crate) fn announce_status_changed(
        &self,
        matcher_id: &str,
        old_status: MatcherStatus,
        new_status: MatcherStatus,
        reason: Option<String>,
    ) -> usize {
        self.announce(LifecycleEvent::StatusChanged {
            matcher_id: matcher_id.to_string(),
            old_status,
            new_status,
            reason,
            timestamp: Utc::now(),
        })
    }

    fn announce(&self, event: LifecycleEvent) -> usize {
        // send() fails only when nobody is listening
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for LifecycleEventBus {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_EVENT_BUFFER)
    }
}
