//! Lifecycle event bus - broadcast-based notifications for registry mutations.
//!
//! The registry is the single writer; the health reporter and external
//! telemetry collectors subscribe. Delivery is best-effort and synchronous
//! relative to the triggering registry call.

mod bus;
mod types;


pub use bus::{LifecycleEventBus, DEFAULT_EVENT_BUFFER};
pub use types::LifecycleEvent;
