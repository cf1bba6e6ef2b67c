//! Lifecycle probe service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!   Orchestrator poll  │  ┌─────────┐    ┌──────────┐                 │
//!   ───────────────────┼─▶│  http   │───▶│  health  │  (read only)    │
//!   GET /health|live|  │  │ server  │    │  state   │◀────────┐       │
//!       ready          │  └─────────┘    └──────────┘         │       │
//!                      │       ▲                              │       │
//!                      │       │ close                        │ clear │
//!   SIGTERM/HUP/INT    │  ┌─────────┐    ┌──────────┐    ┌──────────┐ │
//!   ───────────────────┼─▶│ signals │───▶│ shutdown │───▶│ registry │ │
//!                      │  └─────────┘    └──────────┘    └──────────┘ │
//!                      │                      │                       │
//!                      │                 ┌──────────┐                 │
//!                      │                 │ deadline │── exit(1)       │
//!                      │                 └──────────┘                 │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use lifecycle_probe::config::{load_config, Config, ShutdownTimeout};
use lifecycle_probe::lifecycle::Lifecycle;
use lifecycle_probe::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "lifecycle-probe")]
#[command(about = "Readiness, liveness and graceful shutdown coordinator", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the probe server port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the shutdown timeout in milliseconds.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Wait for shutdown handlers indefinitely.
    #[arg(long, conflicts_with = "timeout_ms")]
    no_timeout: bool,
}

impl Cli {
    fn timeout(&self) -> Option<ShutdownTimeout> {
        if self.no_timeout {
            Some(ShutdownTimeout::Infinite)
        } else {
            self.timeout_ms.map(ShutdownTimeout::from_millis)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.lifecycle.port = port;
    }
    if let Some(timeout) = cli.timeout() {
        config.lifecycle.timeout = timeout;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("lifecycle-probe v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let lifecycle = Lifecycle::start(config.lifecycle).await?;

    lifecycle.register_shutdown_handler(|| async {
        tracing::info!("Flushing in-flight work");
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(())
    })?;

    lifecycle.signal_ready();
    lifecycle.wait_for_shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
