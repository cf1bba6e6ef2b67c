//! Process lifecycle coordinator.
//!
//! Tracks whether a service is ready, alive or shutting down, answers an
//! orchestrator's `/health`, `/live` and `/ready` probes, and runs an ordered,
//! fault-tolerant teardown when a termination signal arrives.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::{LifecycleConfig, ShutdownTimeout, SignalName};
pub use health::{LifecycleState, ProbeStatus};
pub use lifecycle::{HandlerError, Lifecycle, LifecycleError};
