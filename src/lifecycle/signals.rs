//! OS signal handling.
//!
//! # Responsibilities
//! - Subscribe once to each configured signal
//! - Log every receipt and hand it to the shutdown coordinator
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every receipt calls `shutdown`; only the first has an effect
//! - Each `shutdown` call runs on its own task so the listener keeps
//!   draining signals while teardown is in progress
//! - Listeners never keep the coordinator alive; they end with it

use crate::config::SignalName;
use crate::lifecycle::shutdown::Lifecycle;
use crate::lifecycle::LifecycleError;

/// Subscribe to `signals` and route each receipt to `lifecycle.shutdown()`.
///
/// Subscriptions are registered before this returns, so a signal delivered
/// right after startup is not lost.
pub fn install(lifecycle: &Lifecycle, signals: &[SignalName]) -> Result<(), LifecycleError> {
    for &signal in signals {
        let mut listener = SignalListener::new(signal)?;
        let weak = lifecycle.downgrade();

        let task = tokio::spawn(async move {
            while listener.recv().await.is_some() {
                let Some(lifecycle) = weak.upgrade() else {
                    break;
                };
                tracing::info!(signal = %signal, "Received shutdown signal");
                tokio::spawn(async move { lifecycle.shutdown().await });
            }
        });
        lifecycle.track_listener(task.abort_handle());

        tracing::debug!(signal = %signal, "Subscribed to signal");
    }
    Ok(())
}

struct SignalListener {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl SignalListener {
    #[cfg(unix)]
    fn new(signal: SignalName) -> Result<Self, LifecycleError> {
        use tokio::signal::unix::{signal as subscribe, SignalKind};

        let kind = match signal {
            SignalName::Sigterm => SignalKind::terminate(),
            SignalName::Sigint => SignalKind::interrupt(),
            SignalName::Sighup => SignalKind::hangup(),
            SignalName::Sigquit => SignalKind::quit(),
            SignalName::Sigusr1 => SignalKind::user_defined1(),
            SignalName::Sigusr2 => SignalKind::user_defined2(),
        };

        let inner = subscribe(kind).map_err(|source| LifecycleError::Signal { signal, source })?;
        Ok(Self { inner })
    }

    #[cfg(not(unix))]
    fn new(signal: SignalName) -> Result<Self, LifecycleError> {
        match signal {
            SignalName::Sigint => Ok(Self {}),
            other => Err(LifecycleError::UnsupportedSignal(other)),
        }
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> Option<()> {
        self.inner.recv().await
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<()> {
        tokio::signal::ctrl_c().await.ok()
    }
}
