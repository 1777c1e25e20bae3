use super::*;
use admatch_core::{
    Error, MatchOutcome, MatchRequestContext, Matcher, MatcherDescriptor, MatcherRegistry, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
enum Behavior {
    Match,
    Miss,
    Score(f64),
    Fail(&'static str),
}

struct ScriptedMatcher {
    descriptor: MatcherDescriptor,
    delay: Duration,
    behavior: Behavior,
    invocations: AtomicUsize,
}

impl ScriptedMatcher {
    fn new(descriptor: MatcherDescriptor, delay_ms: u64, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            delay: Duration::from_millis(delay_ms),
            behavior,
            invocations: AtomicUsize::new(0),
        })
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Matcher for ScriptedMatcher {
    fn descriptor(&self) -> &MatcherDescriptor {
        &self.descriptor
    }

    async fn evaluate(&self, _context: &MatchRequestContext) -> Result<MatchOutcome> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.behavior {
            Behavior::Match => Ok(MatchOutcome::matched(self.descriptor.id.clone())),
            Behavior::Miss => Ok(MatchOutcome::not_matched(self.descriptor.id.clone())),
            Behavior::Score(score) => {
                Ok(MatchOutcome::matched(self.descriptor.id.clone()).with_score(*score))
            }
            Behavior::Fail(message) => Err(Error::Execution((*message).to_string())),
        }
    }
}

fn add(registry: &MatcherRegistry, matcher: &Arc<ScriptedMatcher>) {
    registry
        .register(
            matcher.descriptor().clone(),
            Arc::clone(matcher) as Arc<dyn Matcher>,
            "test",
            false,
        )
        .expect("registration failed");
}

fn context() -> MatchRequestContext {
    MatchRequestContext::new("req-1", "ad-42")
}

#[tokio::test]
async fn test_invalid_request_is_fatal() {
    let orchestrator = Orchestrator::new(Arc::new(MatcherRegistry::new()));
    let bad = MatchRequestContext::new("", "ad-42");
    let err = orchestrator
        .evaluate(&bad, EvaluationStrategy::FirstMatch)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn test_empty_registry_is_degraded_not_error() {
    let orchestrator = Orchestrator::new(Arc::new(MatcherRegistry::new()));
    let decision = orchestrator
        .evaluate(&context(), EvaluationStrategy::FirstMatch)
        .await
        .unwrap();
    assert!(!decision.matched);
    assert!(decision.outcomes.is_empty());
    assert!(decision.no_matchers_available);
    assert!(!decision.any_skipped);
}

#[tokio::test]
async fn test_outcomes_preserve_ascending_tier_order() {
    let registry = Arc::new(MatcherRegistry::new());
    for (id, priority) in [("late", 5), ("early", 1), ("mid", 3)] {
        let m = ScriptedMatcher::new(
            MatcherDescriptor::new(id, id).with_priority(priority),
            0,
            Behavior::Match,
        );
        add(&registry, &m);
    }

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::AllMatches {
                short_circuit: false,
            },
        )
        .await
        .unwrap();

    let order: Vec<_> = decision
        .outcomes
        .iter()
        .map(|o| o.matcher_id.as_str())
        .collect();
    assert_eq!(order, vec!["early", "mid", "late"]);
    assert!(decision.matched);
}

#[tokio::test]
async fn test_first_match_skips_lower_tiers() {
    let registry = Arc::new(MatcherRegistry::new());
    let hit = ScriptedMatcher::new(
        MatcherDescriptor::new("hit", "Hit")
            .with_priority(1)
            .with_parallel(true),
        0,
        Behavior::Match,
    );
    let never = ScriptedMatcher::new(
        MatcherDescriptor::new("never", "Never").with_priority(2),
        0,
        Behavior::Match,
    );
    add(&registry, &hit);
    add(&registry, &never);

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(&context(), EvaluationStrategy::FirstMatch)
        .await
        .unwrap();

    assert!(decision.matched);
    assert_eq!(decision.outcomes.len(), 1);
    assert_eq!(never.invocations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_all_matches_with_parallel_timeout() {
    let registry = Arc::new(MatcherRegistry::new());
    // A sleeps past its deadline, B answers quickly; both parallel, same tier
    let a = ScriptedMatcher::new(
        MatcherDescriptor::new("a", "A")
            .with_priority(1)
            .with_parallel(true)
            .with_timeout_ms(100),
        200,
        Behavior::Match,
    );
    let b = ScriptedMatcher::new(
        MatcherDescriptor::new("b", "B")
            .with_priority(1)
            .with_parallel(true)
            .with_timeout_ms(100),
        5,
        Behavior::Match,
    );
    add(&registry, &a);
    add(&registry, &b);

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::AllMatches {
                short_circuit: false,
            },
        )
        .await
        .unwrap();

    let a_outcome = decision.outcome_for("a").unwrap();
    assert!(a_outcome.timed_out);
    assert!(!a_outcome.matched);
    let b_outcome = decision.outcome_for("b").unwrap();
    assert!(b_outcome.matched);
    assert!(!decision.matched);
    assert!(decision.any_skipped);
}

#[tokio::test]
async fn test_all_matches_short_circuit_stops_tiers() {
    let registry = Arc::new(MatcherRegistry::new());
    let miss = ScriptedMatcher::new(
        MatcherDescriptor::new("miss", "Miss").with_priority(0),
        0,
        Behavior::Miss,
    );
    let skipped = ScriptedMatcher::new(
        MatcherDescriptor::new("skipped", "Skipped").with_priority(1),
        0,
        Behavior::Match,
    );
    add(&registry, &miss);
    add(&registry, &skipped);

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::AllMatches {
                short_circuit: true,
            },
        )
        .await
        .unwrap();

    assert!(!decision.matched);
    assert_eq!(decision.outcomes.len(), 1);
    assert_eq!(skipped.invocations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_highest_priority_skips_indefinite_tier() {
    let registry = Arc::new(MatcherRegistry::new());
    // Tier 0 produces only a timeout and an error: not definitive
    let late = ScriptedMatcher::new(
        MatcherDescriptor::new("late", "Late")
            .with_priority(0)
            .with_parallel(true)
            .with_timeout_ms(50),
        100,
        Behavior::Match,
    );
    let broken = ScriptedMatcher::new(
        MatcherDescriptor::new("broken", "Broken")
            .with_priority(0)
            .with_parallel(true),
        0,
        Behavior::Fail("backend down"),
    );
    // Tier 1 answers definitively; tier 2 must never run
    let answer = ScriptedMatcher::new(
        MatcherDescriptor::new("answer", "Answer").with_priority(1),
        0,
        Behavior::Match,
    );
    let unreached = ScriptedMatcher::new(
        MatcherDescriptor::new("unreached", "Unreached").with_priority(2),
        0,
        Behavior::Match,
    );
    for m in [&late, &broken, &answer, &unreached] {
        add(&registry, m);
    }

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(&context(), EvaluationStrategy::HighestPriority)
        .await
        .unwrap();

    assert!(decision.matched);
    assert_eq!(decision.outcomes.len(), 3);
    assert_eq!(unreached.invocations(), 0);
    assert!(decision.any_skipped);
}

#[tokio::test]
async fn test_weighted_evaluation_threshold() {
    let registry = Arc::new(MatcherRegistry::new());
    let geo = ScriptedMatcher::new(
        MatcherDescriptor::new("geo", "Geo").with_priority(0),
        0,
        Behavior::Score(0.5),
    );
    let device = ScriptedMatcher::new(
        MatcherDescriptor::new("device", "Device").with_priority(1),
        0,
        Behavior::Score(0.6),
    );
    add(&registry, &geo);
    add(&registry, &device);

    let orchestrator = Orchestrator::new(registry);

    let hit = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::WeightedEvaluation { threshold: 1.1 },
        )
        .await
        .unwrap();
    // Sum exactly meets the threshold; all tiers ran
    assert!(hit.matched);
    assert_eq!(hit.outcomes.len(), 2);

    let miss = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::WeightedEvaluation { threshold: 1.2 },
        )
        .await
        .unwrap();
    assert!(!miss.matched);
}

#[tokio::test]
async fn test_sequential_subset_runs_in_id_order() {
    let registry = Arc::new(MatcherRegistry::new());
    for id in ["c", "a", "b"] {
        let m = ScriptedMatcher::new(
            MatcherDescriptor::new(id, id).with_priority(1),
            0,
            Behavior::Match,
        );
        add(&registry, &m);
    }

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(
            &context(),
            EvaluationStrategy::AllMatches {
                short_circuit: false,
            },
        )
        .await
        .unwrap();

    let order: Vec<_> = decision
        .outcomes
        .iter()
        .map(|o| o.matcher_id.as_str())
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_fault_escalation_across_requests() {
    let registry = Arc::new(MatcherRegistry::new());
    let flaky = ScriptedMatcher::new(
        MatcherDescriptor::new("flaky", "Flaky").with_priority(0),
        0,
        Behavior::Fail("boom"),
    );
    add(&registry, &flaky);

    let orchestrator = Orchestrator::new(Arc::clone(&registry));
    for _ in 0..3 {
        let decision = orchestrator
            .evaluate(&context(), EvaluationStrategy::FirstMatch)
            .await
            .unwrap();
        assert!(!decision.matched);
        assert!(decision.any_skipped);
    }

    // Third consecutive failure faulted the matcher; the fourth call sees
    // an empty enabled set.
    assert!(registry.get_enabled().is_empty());
    let fourth = orchestrator
        .evaluate(&context(), EvaluationStrategy::FirstMatch)
        .await
        .unwrap();
    assert!(fourth.no_matchers_available);
    assert_eq!(flaky.invocations(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_short_circuits_remaining_tiers() {
    let registry = Arc::new(MatcherRegistry::new());
    let slow = ScriptedMatcher::new(
        MatcherDescriptor::new("slow", "Slow")
            .with_priority(0)
            .with_timeout_ms(5_000),
        2_000,
        Behavior::Match,
    );
    let unreached = ScriptedMatcher::new(
        MatcherDescriptor::new("unreached", "Unreached").with_priority(1),
        0,
        Behavior::Match,
    );
    add(&registry, &slow);
    add(&registry, &unreached);

    let orchestrator = Orchestrator::new(registry);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let decision = orchestrator
        .evaluate_with_cancellation(&context(), EvaluationStrategy::FirstMatch, cancel)
        .await
        .unwrap();

    assert!(!decision.matched);
    assert!(decision.any_skipped);
    let slow_outcome = decision.outcome_for("slow").unwrap();
    assert_eq!(slow_outcome.error.as_deref(), Some("evaluation cancelled"));
    assert_eq!(unreached.invocations(), 0);
}

#[tokio::test]
async fn test_pre_cancelled_token_runs_nothing() {
    let registry = Arc::new(MatcherRegistry::new());
    let m = ScriptedMatcher::new(
        MatcherDescriptor::new("m", "M").with_priority(0),
        0,
        Behavior::Match,
    );
    add(&registry, &m);

    let orchestrator = Orchestrator::new(registry);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let decision = orchestrator
        .evaluate_with_cancellation(&context(), EvaluationStrategy::FirstMatch, cancel)
        .await
        .unwrap();

    assert!(!decision.matched);
    assert!(decision.outcomes.is_empty());
    assert!(decision.any_skipped);
    assert_eq!(m.invocations(), 0);
}

#[tokio::test]
async fn test_disabled_matcher_not_scheduled() {
    let registry = Arc::new(MatcherRegistry::new());
    let m = ScriptedMatcher::new(
        MatcherDescriptor::new("m", "M").with_priority(0),
        0,
        Behavior::Match,
    );
    add(&registry, &m);
    registry.disable("m").unwrap();

    let orchestrator = Orchestrator::new(registry);
    let decision = orchestrator
        .evaluate(&context(), EvaluationStrategy::FirstMatch)
        .await
        .unwrap();
    assert!(decision.no_matchers_available);
    assert_eq!(m.invocations(), 0);
}
