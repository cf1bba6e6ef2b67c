//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Bind probe server → Subscribe to signals
//!
//! Shutdown (shutdown.rs):
//!     Signal or direct call → Clear readiness → Drain handlers (registry.rs)
//!     → Close probe server → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGHUP/SIGINT (configurable) → shutdown()
//!
//! Deadlines (deadline.rs):
//!     Global timeout around the whole sequence, fixed timer after close
//! ```
//!
//! # Design Decisions
//! - Shutdown runs once; repeated triggers are logged and ignored
//! - Handlers run strictly in registration order
//! - Shutdown has two timeouts: forced exit after either deadline

pub mod deadline;
pub mod registry;
pub mod shutdown;
pub mod signals;
pub mod startup;

use thiserror::Error;

use crate::config::validation::join_errors;
use crate::config::{SignalName, ValidationError};

pub use deadline::{ProcessTerminator, TerminationReason, Terminator, FORCED_EXIT_CODE, FORCE_EXIT_DELAY};
pub use registry::{DrainReport, HandlerError, HandlerRegistry};
pub use shutdown::Lifecycle;
pub use startup::LifecycleBuilder;

/// Errors surfaced by the lifecycle coordinator.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("failed to bind probe server on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    #[error("failed to subscribe to {signal}: {source}")]
    Signal {
        signal: SignalName,
        source: std::io::Error,
    },

    #[error("{0} cannot be observed on this platform")]
    UnsupportedSignal(SignalName),

    #[error("shutdown has already started")]
    ShutdownInProgress,
}
