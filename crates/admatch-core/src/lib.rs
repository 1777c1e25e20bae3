//! AdMatch Core - matcher registry and lifecycle for the targeting engine
//!
//! This crate provides the data model and mutable state of the targeting
//! matcher subsystem:
//! - Descriptor: identity and scheduling metadata per matcher
//! - Matcher: the capability contract concrete matchers implement
//! - Registry: concurrency-safe register/unregister/status operations
//! - EventBus: broadcast fan-out of registry mutations
//! - Config: typed configuration schema with fail-soft batch validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod event_bus;
pub mod matcher;
pub mod registry;

pub use config::{
    EngineConfig, EngineOptions, MatcherConfiguration, MatcherLifetime, ValidationIssue,
    MAX_DEFAULT_TIMEOUT_MS,
};
pub use descriptor::{MatcherDescriptor, MatcherStatus, MAX_MATCHER_TIMEOUT_MS};
pub use error::{Error, Result};
pub use event_bus::{LifecycleEvent, LifecycleEventBus};
pub use matcher::{MatchOutcome, MatchRequestContext, Matcher};
pub use registry::{MatcherRegistry, ValidationReport, DEFAULT_FAULT_THRESHOLD};
