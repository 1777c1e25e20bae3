//! Matcher registry - live, mutable set of pluggable targeting matchers
//!
//! The registry holds one entry per matcher id: the descriptor, the live
//! handle, and a consecutive-fault counter whose lifecycle is tied to the
//! registration. Writes come from the bootstrapper (cold path) and from the
//! orchestrator's fault accounting (hot path); reads never block on other
//! readers. Every mutation is announced on the lifecycle event bus.


use crate::descriptor::{MatcherDescriptor, MatcherStatus};
use crate::error::{Error, Result};
use crate::event_bus::{LifecycleEvent, LifecycleEventBus};
use crate::matcher::Matcher;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Consecutive execution failures before a matcher is faulted
pub const DEFAULT_FAULT_THRESHOLD: u32 = 3;

/// Re-validation result for one registered descriptor
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Matcher id
    pub matcher_id: String,
    /// Whether every invariant holds
    pub is_valid: bool,
    /// One message per violation
    pub messages: Vec<String>,
}

struct RegisteredMatcher {
    descriptor: MatcherDescriptor,
    handle: Arc<dyn Matcher>,
    consecutive_faults: u32,
    registered_at: DateTime<Utc>,
}

/// Concurrency-safe registry of targeting matchers.
///
/// Backed by a sharded map so snapshots (`get_all`, `get_enabled`) are safe
/// to take while registrations and status transitions happen concurrently.
pub struct MatcherRegistry {
    matchers: DashMap<String, RegisteredMatcher>,
    events: LifecycleEventBus,
    fault_threshold: u32,
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherRegistry {
    /// Create an empty registry with the default fault threshold
    #[must_use]
    pub fn new() -> Self {
        Self {
            matchers: DashMap::new(),
            events: LifecycleEventBus::default(),
            fault_threshold: DEFAULT_FAULT_THRESHOLD,
        }
    }

    /// Override the consecutive-fault threshold
    #[must_use]
    pub fn with_fault_threshold(mut self, threshold: u32) -> Self {
        self.fault_threshold = threshold.max(1);
        self
    }

    /// Add or atomically replace a matcher.
    ///
    /// Replacing an existing id is an implicit unregister + register: the
    /// old handle is dropped and the fault counter starts fresh. Emits a
    /// `Registered` event on success.
    pub fn register(
        &self,
        descriptor: MatcherDescriptor,
        handle: Arc<dyn Matcher>,
        source: impl Into<String>,
        is_hot: bool,
    ) -> Result<()> {
        if descriptor.id.trim().is_empty() {
            return Err(Error::InvalidDescriptor("id must not be empty".to_string()));
        }
        if descriptor.name.trim().is_empty() {
            return Err(Error::InvalidDescriptor(
                "name must not be empty".to_string(),
            ));
        }
        if descriptor.priority < 0 {
            return Err(Error::InvalidDescriptor(format!(
                "priority must be >= 0, got {}",
                descriptor.priority
            )));
        }
        if descriptor.timeout_ms == 0 {
            return Err(Error::InvalidDescriptor(
                "timeout_ms must be > 0".to_string(),
            ));
        }

        debug!(matcher = %descriptor.id, hot = is_hot, "registering matcher");
        let announced = descriptor.clone();
        self.matchers.insert(
            descriptor.id.clone(),
            RegisteredMatcher {
                descriptor,
                handle,
                consecutive_faults: 0,
                registered_at: Utc::now(),
            },
        );
        self.events.announce_registered(&announced, source.into(), is_hot);
        Ok(())
    }

    /// Remove a matcher; emits an `Unregistered` event.
    ///
    /// Returns the descriptor that was removed.
    pub fn unregister(
        &self,
        matcher_id: &str,
        reason: Option<String>,
        is_hot: bool,
    ) -> Result<MatcherDescriptor> {
        let (_, removed) = self
            .matchers
            .remove(matcher_id)
            .ok_or_else(|| Error::NotFound(matcher_id.to_string()))?;
        debug!(matcher = %matcher_id, hot = is_hot, "unregistered matcher");
        self.events.announce_unregistered(matcher_id, reason, is_hot);
        Ok(removed.descriptor)
    }

    /// Transition a matcher's lifecycle status; emits `StatusChanged`.
    ///
    /// Transitioning to `Active` also resets the fault counter so a
    /// reactivated matcher gets a clean slate.
    pub fn set_status(
        &self,
        matcher_id: &str,
        new_status: MatcherStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let old_status = {
            let mut entry = self
                .matchers
                .get_mut(matcher_id)
                .ok_or_else(|| Error::NotFound(matcher_id.to_string()))?;
            let old = entry.descriptor.status;
            entry.descriptor.status = new_status;
            if new_status == MatcherStatus::Active {
                entry.consecutive_faults = 0;
            }
            old
        };
        self.events
            .announce_status_changed(matcher_id, old_status, new_status, reason);
        Ok(())
    }

    /// Mark a matcher as participating in evaluation
    pub fn enable(&self, matcher_id: &str) -> Result<()> {
        self.set_enabled(matcher_id, true)
    }

    /// Skip a matcher without unregistering it
    pub fn disable(&self, matcher_id: &str) -> Result<()> {
        self.set_enabled(matcher_id, false)
    }

    fn set_enabled(&self, matcher_id: &str, enabled: bool) -> Result<()> {
        let mut entry = self
            .matchers
            .get_mut(matcher_id)
            .ok_or_else(|| Error::NotFound(matcher_id.to_string()))?;
        entry.descriptor.enabled = enabled;
        Ok(())
    }

    /// Snapshot one descriptor
    #[must_use]
    pub fn get(&self, matcher_id: &str) -> Option<MatcherDescriptor> {
        self.matchers.get(matcher_id).map(|e| e.descriptor.clone())
    }

    /// Snapshot every descriptor, ordered by (priority, id)
    #[must_use]
    pub fn get_all(&self) -> Vec<MatcherDescriptor> {
        let mut all: Vec<_> = self
            .matchers
            .iter()
            .map(|e| e.descriptor.clone())
            .collect();
        all.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Snapshot descriptors that are enabled and `Active`
    #[must_use]
    pub fn get_enabled(&self) -> Vec<MatcherDescriptor> {
        let mut enabled: Vec<_> = self
            .matchers
            .iter()
            .filter(|e| e.descriptor.is_schedulable())
            .map(|e| e.descriptor.clone())
            .collect();
        enabled.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        enabled
    }

    /// Snapshot schedulable matchers together with their live handles.
    ///
    /// This is what the orchestrator works from for one request; mutations
    /// after the snapshot do not affect an in-flight evaluation.
    #[must_use]
    pub fn enabled_handles(&self) -> Vec<(MatcherDescriptor, Arc<dyn Matcher>)> {
        let mut pairs: Vec<_> = self
            .matchers
            .iter()
            .filter(|e| e.descriptor.is_schedulable())
            .map(|e| (e.descriptor.clone(), Arc::clone(&e.handle)))
            .collect();
        pairs.sort_by(|a, b| {
            a.0.priority
                .cmp(&b.0.priority)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        pairs
    }

    /// Re-check every descriptor's invariants without mutating state
    #[must_use]
    pub fn validate_all(&self) -> Vec<ValidationReport> {
        let mut reports: Vec<_> = self
            .matchers
            .iter()
            .map(|e| {
                let messages = e.descriptor.validate();
                ValidationReport {
                    matcher_id: e.descriptor.id.clone(),
                    is_valid: messages.is_empty(),
                    messages,
                }
            })
            .collect();
        reports.sort_by(|a, b| a.matcher_id.cmp(&b.matcher_id));
        reports
    }

    /// Record a successful execution; resets the consecutive-fault counter.
    pub fn note_success(&self, matcher_id: &str) {
        if let Some(mut entry) = self.matchers.get_mut(matcher_id) {
            entry.consecutive_faults = 0;
        }
    }

    /// Record a failed execution.
    ///
    /// On the `fault_threshold`-th consecutive failure the matcher is
    /// transitioned to `Faulted` and a `StatusChanged` event is emitted.
    /// This is the only automatic status change in the system. Returns
    /// whether escalation happened.
    pub fn note_failure(&self, matcher_id: &str, error: &str) -> bool {
        let escalated_from = {
            let Some(mut entry) = self.matchers.get_mut(matcher_id) else {
                return false;
            };
            entry.consecutive_faults += 1;
            if entry.consecutive_faults >= self.fault_threshold
                && entry.descriptor.status == MatcherStatus::Active
            {
                let old = entry.descriptor.status;
                entry.descriptor.status = MatcherStatus::Faulted;
                entry.consecutive_faults = 0;
                Some(old)
            } else {
                None
            }
        };

        match escalated_from {
            Some(old_status) => {
                warn!(matcher = %matcher_id, error, "matcher faulted after repeated execution failure");
                self.events.announce_status_changed(
                    matcher_id,
                    old_status,
                    MatcherStatus::Faulted,
                    Some("repeated execution failure".to_string()),
                );
                true
            }
            None => false,
        }
    }

    /// Current consecutive-fault count for a matcher
    #[must_use]
    pub fn fault_count(&self, matcher_id: &str) -> Option<u32> {
        self.matchers.get(matcher_id).map(|e| e.consecutive_faults)
    }

    /// When the matcher was (last) registered
    #[must_use]
    pub fn registered_at(&self, matcher_id: &str) -> Option<DateTime<Utc>> {
        self.matchers.get(matcher_id).map(|e| e.registered_at)
    }

    /// Subscribe to lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// The underlying event bus, for fan-out to external collectors
    #[must_use]
    pub fn event_bus(&self) -> &LifecycleEventBus {
        &self.events
    }

    /// Number of registered matchers
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether the registry holds no matchers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
