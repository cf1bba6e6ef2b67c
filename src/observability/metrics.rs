//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_probe_requests_total` (counter): probe polls by probe, status code
//! - `lifecycle_ready` (gauge): 1=ready, 0=not ready
//! - `lifecycle_shutting_down` (gauge): 1 once teardown has begun
//! - `lifecycle_shutdown_handlers_total` (counter): handler runs by outcome
//! - `lifecycle_shutdown_duration_seconds` (histogram): full teardown latency
//! - `lifecycle_forced_exits_total` (counter): force-kill timers fired, by reason
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the library can
//!   be embedded without an exporter
//! - Prometheus exporter is opt-in from the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

const SHUTDOWN_SECONDS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "lifecycle_shutdown_duration_seconds".to_string(),
            ),
            SHUTDOWN_SECONDS,
        )?
        .install()?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_probe(probe: &'static str, status: u16) {
    metrics::counter!(
        "lifecycle_probe_requests_total",
        "probe" => probe,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_ready(ready: bool) {
    metrics::gauge!("lifecycle_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn record_shutting_down() {
    metrics::gauge!("lifecycle_shutting_down").set(1.0);
}

pub fn record_handler(outcome: &'static str) {
    metrics::counter!("lifecycle_shutdown_handlers_total", "outcome" => outcome).increment(1);
}

pub fn record_shutdown_duration(elapsed: Duration) {
    metrics::histogram!("lifecycle_shutdown_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_forced_exit(reason: &'static str) {
    metrics::counter!("lifecycle_forced_exits_total", "reason" => reason).increment(1);
}
