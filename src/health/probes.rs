//! Probe evaluation.
//!
//! Translates the lifecycle flags into the answer an orchestrator expects
//! from `/health`, `/live` and `/ready`:
//!
//! ```text
//! probe    shutting down              ready                      not ready
//! health   500 SHUTTING_DOWN          200 READY                  500 NOT_READY
//! live     500 SHUTTING_DOWN          200 NOT_SHUTTING_DOWN      200 NOT_SHUTTING_DOWN
//! ready    500 NOT_READY              200 READY                  500 NOT_READY
//! ```

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::health::state::LifecycleState;

/// The three probe endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Health,
    Live,
    Ready,
}

impl Probe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Probe::Health => "health",
            Probe::Live => "live",
            Probe::Ready => "ready",
        }
    }
}

/// Descriptive token returned in the probe body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    ServerIsReady,
    ServerIsNotReady,
    ServerIsShuttingDown,
    ServerIsNotShuttingDown,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::ServerIsReady => "SERVER_IS_READY",
            ProbeStatus::ServerIsNotReady => "SERVER_IS_NOT_READY",
            ProbeStatus::ServerIsShuttingDown => "SERVER_IS_SHUTTING_DOWN",
            ProbeStatus::ServerIsNotShuttingDown => "SERVER_IS_NOT_SHUTTING_DOWN",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a probe against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    fn healthy(status: ProbeStatus) -> Self {
        Self { healthy: true, status }
    }

    fn unhealthy(status: ProbeStatus) -> Self {
        Self { healthy: false, status }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.healthy {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ProbeOutcome {
    /// 200 when healthy, 500 otherwise; the status token is the plain-text body.
    fn into_response(self) -> Response {
        (self.status_code(), self.status.as_str()).into_response()
    }
}

/// Evaluate `probe` against `state`. Pure read, no side effects.
pub fn evaluate(probe: Probe, state: &LifecycleState) -> ProbeOutcome {
    match probe {
        Probe::Health => {
            if state.is_shutting_down() {
                ProbeOutcome::unhealthy(ProbeStatus::ServerIsShuttingDown)
            } else if state.is_ready() {
                ProbeOutcome::healthy(ProbeStatus::ServerIsReady)
            } else {
                ProbeOutcome::unhealthy(ProbeStatus::ServerIsNotReady)
            }
        }
        Probe::Live => {
            if state.is_shutting_down() {
                ProbeOutcome::unhealthy(ProbeStatus::ServerIsShuttingDown)
            } else {
                ProbeOutcome::healthy(ProbeStatus::ServerIsNotShuttingDown)
            }
        }
        // Readiness is cleared when shutdown begins, so the flag alone decides.
        Probe::Ready => {
            if state.is_ready() {
                ProbeOutcome::healthy(ProbeStatus::ServerIsReady)
            } else {
                ProbeOutcome::unhealthy(ProbeStatus::ServerIsNotReady)
            }
        }
    }
}
