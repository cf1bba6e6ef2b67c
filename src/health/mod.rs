//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! Application code:
//!     signal_ready / signal_not_ready
//!     → state.rs (flags)
//!
//! Shutdown orchestrator:
//!     begin_shutdown
//!     → state.rs (readiness cleared, shutting down latched)
//!
//! Orchestrator polls (probes.rs):
//!     GET /health, /live, /ready
//!     → evaluate against state.rs
//!     → 200 / 500 + status token
//! ```
//!
//! # Design Decisions
//! - Liveness and readiness are answered separately
//! - Probes never mutate state
//! - State is per instance, not process-wide

pub mod probes;
pub mod state;

pub use probes::{evaluate, Probe, ProbeOutcome, ProbeStatus};
pub use state::{LifecycleState, Transition};
