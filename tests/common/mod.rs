//! Shared utilities for integration testing.

use std::sync::{Arc, Mutex};

use lifecycle_probe::config::{LifecycleConfig, ShutdownTimeout, SignalName};
use lifecycle_probe::lifecycle::{Lifecycle, TerminationReason, Terminator};

/// Records forced exits instead of ending the test process.
#[derive(Default)]
pub struct RecordingTerminator {
    calls: Mutex<Vec<(TerminationReason, i32)>>,
}

impl RecordingTerminator {
    pub fn calls(&self) -> Vec<(TerminationReason, i32)> {
        self.calls.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn timeouts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(reason, _)| *reason == TerminationReason::ShutdownTimeout)
            .count()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, reason: TerminationReason, exit_code: i32) {
        self.calls.lock().unwrap().push((reason, exit_code));
    }
}

/// Start a coordinator on an ephemeral port.
pub async fn start_lifecycle(
    signals: Vec<SignalName>,
    timeout: ShutdownTimeout,
) -> (Lifecycle, Arc<RecordingTerminator>) {
    let terminator = Arc::new(RecordingTerminator::default());
    let config = LifecycleConfig {
        port: 0,
        signals,
        timeout,
    };
    let lifecycle = Lifecycle::builder(config)
        .terminator(terminator.clone())
        .start()
        .await
        .unwrap();
    (lifecycle, terminator)
}

/// GET a probe path, returning status code and body.
#[allow(dead_code)]
pub async fn probe(lifecycle: &Lifecycle, path: &str) -> (u16, String) {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://127.0.0.1:{}{}", lifecycle.local_addr().port(), path))
        .send()
        .await
        .expect("Probe server unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}
