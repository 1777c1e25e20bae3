//! AdMatch Engine - targeting evaluation for the ad-serving platform
//!
//! This crate provides the runtime side of the targeting matcher subsystem:
//! - Orchestrator: tiered, deadline-bounded execution of the enabled
//!   matcher set with pluggable aggregation strategies
//! - Health: registry and validation state condensed into a pull-based
//!   health signal
//!
//! Matcher registration and configuration live in `admatch-core`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod health;
pub mod orchestrator;

pub use health::{HealthReport, HealthReporter, HealthSource, HealthStatus};
pub use orchestrator::{AggregatedDecision, EvaluationStrategy, Orchestrator, OrchestratorConfig};
