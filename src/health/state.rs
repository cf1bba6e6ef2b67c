//! Process lifecycle state machine.
//!
//! # States
//! - Not ready: initial state, process is not accepting work
//! - Ready: application signalled it can take traffic
//! - Shutting down: terminal, teardown has begun
//!
//! # State Transitions
//! ```text
//! NotReady ←→ Ready        (mark_ready / mark_not_ready)
//! NotReady → ShuttingDown  (begin_shutdown)
//! Ready → ShuttingDown     (begin_shutdown, readiness cleared in the same step)
//! ```
//!
//! # Design Decisions
//! - Both flags live in one atomic word so "clear ready, set shutting down"
//!   can never interleave with a concurrent `mark_ready`
//! - Redundant transitions are logged at warn level, never errors
//! - Shutting down is monotonic for the lifetime of the process

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::watch;

use crate::observability::metrics;

const READY: u8 = 0b01;
const SHUTTING_DOWN: u8 = 0b10;

/// Outcome of a state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The flags changed.
    Applied,
    /// The flag already held the requested value.
    Unchanged,
    /// The service is shutting down; the request was ignored.
    Rejected,
}

/// Readiness and shutdown flags for one service instance.
#[derive(Debug)]
pub struct LifecycleState {
    flags: AtomicU8,
    /// Latches to true the first time the service becomes ready.
    first_ready: watch::Sender<bool>,
}

impl LifecycleState {
    /// Create a state that is neither ready nor shutting down.
    pub fn new() -> Self {
        let (first_ready, _) = watch::channel(false);
        Self {
            flags: AtomicU8::new(0),
            first_ready,
        }
    }

    /// Whether the service currently accepts work.
    pub fn is_ready(&self) -> bool {
        self.flags.load(Ordering::Acquire) & READY != 0
    }

    /// Whether teardown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.flags.load(Ordering::Acquire) & SHUTTING_DOWN != 0
    }

    /// Mark the service as ready to accept work.
    pub fn mark_ready(&self) -> Transition {
        let transition = self.update(|flags| flags | READY);
        match transition {
            Transition::Applied => {
                tracing::info!("Service is ready");
                self.first_ready.send_replace(true);
                metrics::record_ready(true);
            }
            Transition::Unchanged => {
                tracing::warn!("Service is already in a ready state");
            }
            Transition::Rejected => {
                tracing::warn!("Service is shutting down; ignoring request to mark it ready");
            }
        }
        transition
    }

    /// Mark the service as not accepting work.
    pub fn mark_not_ready(&self) -> Transition {
        let transition = self.update(|flags| flags & !READY);
        match transition {
            Transition::Applied => {
                tracing::info!("Service is not ready");
                metrics::record_ready(false);
            }
            Transition::Unchanged => {
                tracing::warn!("Service is already in a not ready state");
            }
            Transition::Rejected => {
                tracing::warn!("Service is shutting down; ignoring request to mark it not ready");
            }
        }
        transition
    }

    /// Clear readiness and enter the shutting down state.
    ///
    /// Returns `true` only for the call that performed the transition; every
    /// later call returns `false`.
    pub fn begin_shutdown(&self) -> bool {
        let previous = self.flags.swap(SHUTTING_DOWN, Ordering::AcqRel);
        let entered = previous & SHUTTING_DOWN == 0;
        if entered {
            metrics::record_ready(false);
            metrics::record_shutting_down();
        }
        entered
    }

    /// Wait until the service has been marked ready at least once.
    pub async fn when_first_ready(&self) {
        let mut rx = self.first_ready.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// CAS loop applying `apply` unless the service is shutting down.
    fn update(&self, apply: impl Fn(u8) -> u8) -> Transition {
        let mut current = self.flags.load(Ordering::Acquire);
        loop {
            if current & SHUTTING_DOWN != 0 {
                return Transition::Rejected;
            }
            let next = apply(current);
            if next == current {
                return Transition::Unchanged;
            }
            match self.flags.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Transition::Applied,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = LifecycleState::new();
        assert!(!state.is_ready());
        assert!(!state.is_shutting_down());
    }

    #[test]
    fn test_ready_reflects_latest_call() {
        let state = LifecycleState::new();

        assert_eq!(state.mark_ready(), Transition::Applied);
        assert!(state.is_ready());

        assert_eq!(state.mark_ready(), Transition::Unchanged);
        assert!(state.is_ready());

        assert_eq!(state.mark_not_ready(), Transition::Applied);
        assert!(!state.is_ready());

        assert_eq!(state.mark_not_ready(), Transition::Unchanged);
        assert!(!state.is_ready());

        assert_eq!(state.mark_ready(), Transition::Applied);
        assert!(state.is_ready());
    }

    #[test]
    fn test_shutdown_clears_readiness_for_good() {
        let state = LifecycleState::new();
        state.mark_ready();

        assert!(state.begin_shutdown());
        assert!(!state.is_ready());
        assert!(state.is_shutting_down());

        assert_eq!(state.mark_ready(), Transition::Rejected);
        assert_eq!(state.mark_not_ready(), Transition::Rejected);
        assert!(!state.is_ready());
        assert!(state.is_shutting_down());
    }

    #[test]
    fn test_begin_shutdown_only_once() {
        let state = LifecycleState::new();
        assert!(state.begin_shutdown());
        assert!(!state.begin_shutdown());
        assert!(state.is_shutting_down());
    }

    #[tokio::test]
    async fn test_when_first_ready_latches() {
        let state = std::sync::Arc::new(LifecycleState::new());

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.when_first_ready().await })
        };

        state.mark_ready();
        state.mark_not_ready();
        waiter.await.unwrap();

        // Already latched, resolves immediately even though not ready now.
        tokio::time::timeout(std::time::Duration::from_millis(100), state.when_first_ready())
            .await
            .unwrap();
    }
}
