use super::types::{AggregatedDecision, EvaluationStrategy, OrchestratorConfig};
use admatch_core::{
    MatchOutcome, MatchRequestContext, Matcher, MatcherDescriptor, MatcherRegistry, Result,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Schedules and runs the enabled matcher set for one request.
///
/// The orchestrator is the only component that spawns concurrent work, and
/// only within the parallel subset of a single priority tier. Per-matcher
/// failures are absorbed into outcomes; only a malformed request context is
/// surfaced to the caller.
pub struct Orchestrator {
    registry: Arc<MatcherRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with default configuration
    #[must_use]
    pub fn new(registry: Arc<MatcherRegistry>) -> Self {
        Self::with_config(registry, OrchestratorConfig::default())
    }

    /// Create an orchestrator with explicit configuration
    #[must_use]
    pub fn with_config(registry: Arc<MatcherRegistry>, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    /// The registry this orchestrator schedules from
    #[must_use]
    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    /// Evaluate one request against the current enabled matcher set.
    pub async fn evaluate(
        &self,
        context: &MatchRequestContext,
        strategy: EvaluationStrategy,
    ) -> Result<AggregatedDecision> {
        self.evaluate_with_cancellation(context, strategy, CancellationToken::new())
            .await
    }

    /// Evaluate with a caller-supplied cancellation token.
    ///
    /// Cancellation propagates into every still-running matcher invocation
    /// and short-circuits remaining tiers; the decision gathered so far is
    /// still returned with `any_skipped` set.
    #[instrument(skip(self, context, cancel), fields(request_id = %context.request_id))]
    pub async fn evaluate_with_cancellation(
        &self,
        context: &MatchRequestContext,
        strategy: EvaluationStrategy,
        cancel: CancellationToken,
    ) -> Result<AggregatedDecision> {
        context.validate()?;

        let started = Instant::now();
        let evaluation_id = Uuid::new_v4();
        let snapshot = self.registry.enabled_handles();

        if snapshot.is_empty() {
            debug!(%evaluation_id, "no matchers available, returning degraded decision");
            return Ok(AggregatedDecision::no_matchers(
                evaluation_id,
                strategy,
                started.elapsed().as_millis() as u64,
            ));
        }

        // Group into priority tiers; BTreeMap iteration gives strictly
        // ascending priority order.
        let mut tiers: BTreeMap<i32, Vec<(MatcherDescriptor, Arc<dyn Matcher>)>> = BTreeMap::new();
        for (descriptor, handle) in snapshot {
            tiers
                .entry(descriptor.priority)
                .or_default()
                .push((descriptor, handle));
        }

        let mut outcomes: Vec<MatchOutcome> = Vec::new();
        let mut cancelled = false;
        let mut highest_priority_matched = None;

        'tiers: for (priority, members) in tiers {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            debug!(%evaluation_id, priority, members = members.len(), "starting tier");

            let (parallel, mut sequential): (Vec<_>, Vec<_>) = members
                .into_iter()
                .partition(|(descriptor, _)| descriptor.can_run_in_parallel);
            // Deterministic order for the sequential subset
            sequential.sort_by(|a, b| a.0.id.cmp(&b.0.id));

            let mut tier_outcomes = Vec::with_capacity(parallel.len() + sequential.len());

            // Fan out the parallel subset; each member has its own deadline
            // and a timed-out member does not block its siblings.
            if !parallel.is_empty() {
                let futures: Vec<_> = parallel
                    .iter()
                    .map(|(descriptor, handle)| {
                        self.run_one(descriptor, Arc::clone(handle), context, &cancel)
                    })
                    .collect();
                tier_outcomes.extend(join_all(futures).await);
            }

            for (descriptor, handle) in &sequential {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                tier_outcomes.push(
                    self.run_one(descriptor, Arc::clone(handle), context, &cancel)
                        .await,
                );
            }
            if cancel.is_cancelled() {
                cancelled = true;
            }

            // The tier is fully resolved; apply the aggregation policy
            // before the next tier may start.
            match strategy {
                EvaluationStrategy::FirstMatch => {
                    let hit = tier_outcomes.iter().any(|o| o.matched);
                    outcomes.extend(tier_outcomes);
                    if hit {
                        break 'tiers;
                    }
                }
                EvaluationStrategy::AllMatches { short_circuit } => {
                    let miss = tier_outcomes.iter().any(|o| !o.matched);
                    outcomes.extend(tier_outcomes);
                    if short_circuit && miss {
                        break 'tiers;
                    }
                }
                EvaluationStrategy::HighestPriority => {
                    let decisive = tier_outcomes.iter().any(MatchOutcome::is_definitive);
                    if decisive {
                        highest_priority_matched = Some(
                            tier_outcomes
                                .iter()
                                .any(|o| o.is_definitive() && o.matched),
                        );
                    }
                    outcomes.extend(tier_outcomes);
                    if highest_priority_matched.is_some() {
                        break 'tiers;
                    }
                }
                EvaluationStrategy::WeightedEvaluation { .. } => {
                    outcomes.extend(tier_outcomes);
                }
            }

            if cancelled {
                break;
            }
        }

        let matched = match strategy {
            EvaluationStrategy::FirstMatch => outcomes.iter().any(|o| o.matched),
            EvaluationStrategy::AllMatches { .. } => {
                !outcomes.is_empty() && outcomes.iter().all(|o| o.matched)
            }
            EvaluationStrategy::HighestPriority => highest_priority_matched.unwrap_or(false),
            EvaluationStrategy::WeightedEvaluation { threshold } => {
                let sum: f64 = outcomes.iter().filter_map(|o| o.score).sum();
                sum >= threshold
            }
        };

        let any_skipped = cancelled || outcomes.iter().any(|o| !o.is_definitive());
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            %evaluation_id,
            matched,
            outcomes = outcomes.len(),
            elapsed_ms,
            any_skipped,
            "evaluation finished"
        );

        Ok(AggregatedDecision {
            evaluation_id,
            matched,
            outcomes,
            strategy,
            elapsed_ms,
            any_skipped,
            no_matchers_available: false,
        })
    }

    /// Run one matcher under its own deadline and the request-wide token.
    ///
    /// Never returns an error: timeouts and execution failures become
    /// outcomes, and fault accounting is forwarded to the registry.
    async fn run_one(
        &self,
        descriptor: &MatcherDescriptor,
        handle: Arc<dyn Matcher>,
        context: &MatchRequestContext,
        cancel: &CancellationToken,
    ) -> MatchOutcome {
        let deadline = Duration::from_millis(descriptor.timeout_ms).min(self.config.max_timeout);
        let start = Instant::now();

        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                debug!(matcher = %descriptor.id, "invocation cancelled");
                MatchOutcome::failure(
                    descriptor.id.clone(),
                    "evaluation cancelled",
                    start.elapsed().as_millis() as u64,
                )
            }
            result = timeout(deadline, handle.evaluate(context)) => match result {
                Ok(Ok(mut outcome)) => {
                    outcome.matcher_id = descriptor.id.clone();
                    outcome.duration_ms = start.elapsed().as_millis() as u64;
                    self.registry.note_success(&descriptor.id);
                    outcome
                }
                Ok(Err(e)) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    warn!(matcher = %descriptor.id, error = %e, "matcher execution failed");
                    self.registry.note_failure(&descriptor.id, &e.to_string());
                    MatchOutcome::failure(descriptor.id.clone(), e.to_string(), duration_ms)
                }
                Err(_) => {
                    // Timeouts neither extend nor break the fault streak
                    warn!(
                        matcher = %descriptor.id,
                        timeout_ms = deadline.as_millis() as u64,
                        "matcher timed out"
                    );
                    MatchOutcome::timed_out(descriptor.id.clone(), deadline.as_millis() as u64)
                }
            }
        };

        if self.config.performance_monitoring {
            debug!(
                matcher = %descriptor.id,
                duration_ms = outcome.duration_ms,
                matched = outcome.matched,
                timed_out = outcome.timed_out,
                "matcher outcome"
            );
        }
        outcome
    }
}
