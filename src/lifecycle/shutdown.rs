//! Shutdown coordination for the service.
//!
//! # Protocol
//! ```text
//! shutdown() ──(first call only)──▶ clear ready, latch shutting down
//!     ├─ arm global force-kill timer (unless timeout is infinite)
//!     ├─ drain shutdown handlers, one at a time
//!     ├─ close the probe server
//!     └─ arm last-resort force-exit timer
//! ```
//!
//! Re-entrant calls warn and return immediately.
//!
//! Signal listeners hold only a [`WeakLifecycle`]; dropping the last
//! [`Lifecycle`] aborts them and closes the probe server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::config::LifecycleConfig;
use crate::health::LifecycleState;
use crate::http::ServerHandle;
use crate::lifecycle::deadline::{self, RaceOutcome, Terminator, FORCE_EXIT_DELAY};
use crate::lifecycle::registry::{HandlerError, HandlerRegistry};
use crate::lifecycle::startup::LifecycleBuilder;
use crate::lifecycle::LifecycleError;
use crate::observability::metrics;

/// Coordinator for readiness, liveness and graceful shutdown.
///
/// Cheap to clone; every clone drives the same instance.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    config: LifecycleConfig,
    state: Arc<LifecycleState>,
    handlers: HandlerRegistry,
    local_addr: SocketAddr,
    /// Taken exactly once, by the shutdown sequence.
    transport: Mutex<Option<ServerHandle>>,
    terminator: Arc<dyn Terminator>,
    /// Flips to true when the shutdown sequence has finished.
    completed: watch::Sender<bool>,
    /// Signal listener tasks, aborted when the last handle goes away.
    listeners: Mutex<Vec<AbortHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let listeners = self
            .listeners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.drain(..) {
            listener.abort();
        }
    }
}

/// Non-owning reference to a [`Lifecycle`].
#[derive(Clone)]
pub(crate) struct WeakLifecycle {
    inner: Weak<Inner>,
}

impl WeakLifecycle {
    pub(crate) fn upgrade(&self) -> Option<Lifecycle> {
        self.inner.upgrade().map(|inner| Lifecycle { inner })
    }
}

impl Lifecycle {
    /// Start configuring a coordinator.
    pub fn builder(config: LifecycleConfig) -> LifecycleBuilder {
        LifecycleBuilder::new(config)
    }

    /// Bind the probe server and subscribe to the configured signals.
    pub async fn start(config: LifecycleConfig) -> Result<Self, LifecycleError> {
        Self::builder(config).start().await
    }

    pub(crate) fn new(
        config: LifecycleConfig,
        state: Arc<LifecycleState>,
        transport: ServerHandle,
        terminator: Arc<dyn Terminator>,
    ) -> Self {
        let (completed, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                state,
                handlers: HandlerRegistry::new(),
                local_addr: transport.local_addr(),
                transport: Mutex::new(Some(transport)),
                terminator,
                completed,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_server_ready(&self) -> bool {
        self.inner.state.is_ready()
    }

    pub fn is_server_shutting_down(&self) -> bool {
        self.inner.state.is_shutting_down()
    }

    /// Register a handler to run during shutdown.
    ///
    /// Handlers run in registration order. Registration is rejected once the
    /// shutdown sequence has started draining handlers.
    pub fn register_shutdown_handler<F, Fut>(&self, handler: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.inner.handlers.register(handler)
    }

    /// Mark the service as ready to accept work. Ignored while shutting down.
    pub fn signal_ready(&self) {
        self.inner.state.mark_ready();
    }

    /// Mark the service as not accepting work. Ignored while shutting down.
    pub fn signal_not_ready(&self) {
        self.inner.state.mark_not_ready();
    }

    /// Resolves the first time the service is marked ready.
    pub async fn when_first_ready(&self) {
        self.inner.state.when_first_ready().await
    }

    /// Run the shutdown sequence.
    ///
    /// Only the first call has an effect. The sequence runs on its own task,
    /// so dropping the returned future does not cancel it. Never fails: handler
    /// and transport errors are logged, and a timeout terminates the process.
    pub async fn shutdown(&self) {
        if !self.inner.state.begin_shutdown() {
            tracing::warn!("Shutdown already in progress; ignoring request");
            return;
        }

        tracing::info!(
            timeout = %self.inner.config.timeout,
            "Received request to shutdown the service"
        );

        let inner = self.inner.clone();
        if let Err(e) = tokio::spawn(async move { inner.run_shutdown().await }).await {
            tracing::error!(error = %e, "Shutdown task failed");
        }
    }

    /// Resolves once a shutdown sequence, however it was started, has finished.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.inner.completed.subscribe();
        // The sender lives in `inner`, which this handle keeps alive.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Address the probe server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Shared lifecycle flags.
    pub fn state(&self) -> Arc<LifecycleState> {
        self.inner.state.clone()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> WeakLifecycle {
        WeakLifecycle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Tie a background task to this instance; it is aborted on drop.
    pub(crate) fn track_listener(&self, listener: AbortHandle) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

impl Inner {
    async fn run_shutdown(&self) {
        let started = Instant::now();

        let outcome = deadline::race(
            self.teardown(),
            self.config.timeout.as_duration(),
            self.terminator.as_ref(),
        )
        .await;

        if outcome == RaceOutcome::Completed {
            metrics::record_shutdown_duration(started.elapsed());
            tracing::info!(
                elapsed_ms = deadline::millis(started.elapsed()),
                "Shutdown sequence complete"
            );
        }

        self.completed.send_replace(true);
    }

    async fn teardown(&self) {
        self.handlers.drain().await;

        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(server) = transport {
            match server.close().await {
                Ok(()) => tracing::info!("Probe server closed"),
                Err(e) => tracing::error!(error = %e, "Failed to close the probe server"),
            }
        }

        deadline::arm_detached(FORCE_EXIT_DELAY, self.terminator.clone());
    }
}
