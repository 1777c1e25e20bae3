//! Execution orchestrator - tiered scheduling with per-matcher deadlines
//!
//! For each request the orchestrator snapshots the enabled matcher set,
//! partitions it into priority tiers, and runs each tier to completion
//! (parallel subset fanned out, sequential subset in deterministic id
//! order) before the next tier starts. Aggregation is governed by an
//! [`EvaluationStrategy`]; per-matcher timeouts and failures never reach
//! the caller.

mod core;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::Orchestrator;
pub use types::{AggregatedDecision, EvaluationStrategy, OrchestratorConfig};
