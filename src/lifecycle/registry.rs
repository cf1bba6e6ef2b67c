//! Shutdown handler registry.
//!
//! # Responsibilities
//! - Keep application teardown callbacks in registration order
//! - Run them one at a time during shutdown
//! - Isolate failures: an error or panic in one handler never stops the next
//!
//! # Design Decisions
//! - The registry is drained exactly once; draining seals it under the same
//!   lock that takes the snapshot, so a registration either lands in the
//!   snapshot or is rejected
//! - No deduplication and no priorities: order is the caller's contract

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::lifecycle::LifecycleError;
use crate::observability::metrics;

/// Error type returned by shutdown handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type BoxedHandler = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HandlerError>> + Send>;

/// Counts of handler outcomes from one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Ordered collection of teardown callbacks.
pub struct HandlerRegistry {
    /// `None` once the registry has been drained.
    handlers: Mutex<Option<Vec<BoxedHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Some(Vec::new())),
        }
    }

    /// Append a handler.
    ///
    /// Fails with [`LifecycleError::ShutdownInProgress`] once draining began;
    /// such a handler would never run.
    pub fn register<F, Fut>(&self, handler: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        match self.lock().as_mut() {
            Some(handlers) => {
                handlers.push(Box::new(move || handler().boxed()));
                tracing::debug!(count = handlers.len(), "Shutdown handler registered");
                Ok(())
            }
            None => {
                tracing::warn!("Shutdown already started; rejecting shutdown handler");
                Err(LifecycleError::ShutdownInProgress)
            }
        }
    }

    /// Number of handlers waiting to run.
    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`drain`](Self::drain) has been called.
    pub fn is_sealed(&self) -> bool {
        self.lock().is_none()
    }

    /// Run every registered handler sequentially, in registration order.
    ///
    /// Handler N+1 starts only after handler N has settled. Never fails; a
    /// second call finds nothing to run.
    pub async fn drain(&self) -> DrainReport {
        let handlers = self.lock().take().unwrap_or_default();
        let total = handlers.len();
        let mut report = DrainReport::default();

        tracing::info!(count = total, "Running shutdown handlers");

        for (index, handler) in handlers.into_iter().enumerate() {
            let outcome = AssertUnwindSafe(async move { handler().await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {
                    report.succeeded += 1;
                    metrics::record_handler("ok");
                    tracing::debug!(handler = index, "Shutdown handler finished");
                }
                Ok(Err(error)) => {
                    report.failed += 1;
                    metrics::record_handler("error");
                    tracing::error!(handler = index, error = %error, "Shutdown handler produced an error");
                }
                Err(panic) => {
                    report.failed += 1;
                    metrics::record_handler("panic");
                    tracing::error!(
                        handler = index,
                        panic = panic_message(panic.as_ref()),
                        "Shutdown handler panicked"
                    );
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Shutdown handlers finished"
        );
        report
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<BoxedHandler>>> {
        // Handlers are never run while the lock is held, so poisoning only
        // means a panic elsewhere; the list itself is intact.
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
