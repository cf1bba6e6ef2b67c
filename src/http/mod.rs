//! HTTP transport for the probe endpoints.
//!
//! # Data Flow
//! ```text
//! Orchestrator poll (GET /health | /live | /ready)
//!     → server.rs (Axum router, tracing layer)
//!     → health::probes (evaluate against lifecycle state)
//!     → 200 / 500 + plain-text status token
//! ```

pub mod server;

pub use server::{build_router, ProbeServer, ServerHandle};
