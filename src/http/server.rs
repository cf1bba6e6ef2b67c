//! Probe server setup.
//!
//! # Responsibilities
//! - Create Axum Router with the three probe handlers
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Hand back a handle that closes the server exactly once

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::health::{evaluate, LifecycleState, Probe, ProbeOutcome};
use crate::observability::metrics;

/// Build the probe router over `state`.
pub fn build_router(state: Arc<LifecycleState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/live", get(live_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler(State(state): State<Arc<LifecycleState>>) -> ProbeOutcome {
    respond(Probe::Health, &state)
}

async fn live_handler(State(state): State<Arc<LifecycleState>>) -> ProbeOutcome {
    respond(Probe::Live, &state)
}

async fn ready_handler(State(state): State<Arc<LifecycleState>>) -> ProbeOutcome {
    respond(Probe::Ready, &state)
}

fn respond(probe: Probe, state: &LifecycleState) -> ProbeOutcome {
    let outcome = evaluate(probe, state);
    metrics::record_probe(probe.as_str(), outcome.status_code().as_u16());
    tracing::debug!(probe = probe.as_str(), status = %outcome.status, "Probe answered");
    outcome
}

/// HTTP server exposing the probe endpoints.
pub struct ProbeServer {
    router: Router,
}

impl ProbeServer {
    pub fn new(state: Arc<LifecycleState>) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Bind `0.0.0.0:port` and start serving in the background.
    pub async fn bind(self, port: u16) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        self.serve(listener)
    }

    /// Start serving on an already bound listener.
    pub fn serve(self, listener: TcpListener) -> io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (close_tx, close_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, self.router)
                .with_graceful_shutdown(async {
                    // A dropped handle closes the server as well.
                    let _ = close_rx.await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "Probe server listening");

        Ok(ServerHandle {
            local_addr,
            close_tx,
            task,
        })
    }
}

/// Ownership of a running probe server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn close(self) -> io::Result<()> {
        // The server may already have stopped on its own; its result is below.
        let _ = self.close_tx.send(());
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(io::Error::other(join_error)),
        }
    }
}

#[cfg(test)]
impl ServerHandle {
    /// A handle whose server task was cancelled, so `close` fails.
    pub(crate) fn cancelled(local_addr: SocketAddr) -> Self {
        let (close_tx, _) = oneshot::channel();
        let task = tokio::spawn(std::future::pending::<io::Result<()>>());
        task.abort();
        Self {
            local_addr,
            close_tx,
            task,
        }
    }
}
