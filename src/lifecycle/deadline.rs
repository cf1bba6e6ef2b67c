//! Force-kill timers.
//!
//! # Responsibilities
//! - Race the teardown sequence against the configured shutdown timeout
//! - Arm the fixed last-resort timer once the transport is closed
//! - Route every forced exit through a [`Terminator`]
//!
//! # Design Decisions
//! - The global timer is cancellable: it is dropped when teardown wins
//! - The last-resort timer runs on a detached OS thread, which never keeps
//!   the process alive once `main` returns and still fires if the async
//!   runtime is wedged

use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::observability::metrics;

/// Exit status used for every forced termination.
pub const FORCED_EXIT_CODE: i32 = 1;

/// Delay between closing the transport and the last-resort forced exit.
pub const FORCE_EXIT_DELAY: Duration = Duration::from_secs(1);

/// Why the process is being forcibly terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The whole shutdown sequence exceeded the configured timeout.
    ShutdownTimeout,
    /// The process was still alive [`FORCE_EXIT_DELAY`] after the transport closed.
    LingeringAfterClose,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::ShutdownTimeout => "shutdown_timeout",
            TerminationReason::LingeringAfterClose => "lingering_after_close",
        }
    }
}

/// Ends the process.
///
/// Production code uses [`ProcessTerminator`]; tests install one that
/// records the call instead.
pub trait Terminator: Send + Sync + 'static {
    fn terminate(&self, reason: TerminationReason, exit_code: i32);
}

/// Exits the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, reason: TerminationReason, exit_code: i32) {
        tracing::error!(reason = reason.as_str(), exit_code, "Forcing process exit");
        std::process::exit(exit_code);
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result of racing a future against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome {
    Completed,
    TimedOut,
}

/// Run `sequence` to completion unless `timeout` elapses first.
///
/// With no timeout the sequence always completes. When the deadline wins the
/// sequence is dropped at its current suspension point and `terminator` is
/// invoked.
pub async fn race<F>(
    sequence: F,
    timeout: Option<Duration>,
    terminator: &dyn Terminator,
) -> RaceOutcome
where
    F: Future<Output = ()>,
{
    let Some(timeout) = timeout else {
        sequence.await;
        return RaceOutcome::Completed;
    };

    tokio::select! {
        _ = sequence => RaceOutcome::Completed,
        _ = tokio::time::sleep(timeout) => {
            tracing::error!(
                timeout_ms = millis(timeout),
                "Shutdown did not complete within the timeout; terminating"
            );
            metrics::record_forced_exit(TerminationReason::ShutdownTimeout.as_str());
            terminator.terminate(TerminationReason::ShutdownTimeout, FORCED_EXIT_CODE);
            RaceOutcome::TimedOut
        }
    }
}

/// Arm the last-resort timer on a detached thread.
///
/// Nothing cancels it: if the process is still running after `delay`, it
/// is terminated.
pub fn arm_detached(delay: Duration, terminator: Arc<dyn Terminator>) {
    let spawned = thread::Builder::new()
        .name("force-exit".to_string())
        .spawn(move || {
            thread::sleep(delay);
            tracing::warn!(
                delay_ms = millis(delay),
                "Process did not exit after the transport closed; terminating"
            );
            metrics::record_forced_exit(TerminationReason::LingeringAfterClose.as_str());
            terminator.terminate(TerminationReason::LingeringAfterClose, FORCED_EXIT_CODE);
        });

    if let Err(e) = spawned {
        tracing::error!(error = %e, "Failed to arm force-exit timer");
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTerminator;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let terminator = RecordingTerminator::default();
        let outcome = race(
            tokio::time::sleep(Duration::from_millis(10)),
            Some(Duration::from_millis(50)),
            &terminator,
        )
        .await;

        assert_eq!(outcome, RaceOutcome::Completed);
        assert!(terminator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_terminates() {
        let terminator = RecordingTerminator::default();
        let outcome = race(std::future::pending::<()>(), Some(Duration::from_millis(50)), &terminator).await;

        assert_eq!(outcome, RaceOutcome::TimedOut);
        assert_eq!(
            terminator.calls(),
            vec![(TerminationReason::ShutdownTimeout, FORCED_EXIT_CODE)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deadline_waits() {
        let terminator = RecordingTerminator::default();
        let outcome = race(
            tokio::time::sleep(Duration::from_secs(3600)),
            None,
            &terminator,
        )
        .await;

        assert_eq!(outcome, RaceOutcome::Completed);
        assert!(terminator.calls().is_empty());
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_detached_timer_fires() {
        let terminator = Arc::new(RecordingTerminator::default());
        arm_detached(Duration::from_millis(10), terminator.clone());

        thread::sleep(Duration::from_millis(200));
        assert_eq!(
            terminator.calls(),
            vec![(TerminationReason::LingeringAfterClose, FORCED_EXIT_CODE)]
        );
    }
}
