//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the lifecycle configuration
//! - Bind the probe server
//! - Subscribe to the configured signals
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before the coordinator exists
//! - The probe server starts in the not-ready state; the application decides
//!   when to signal readiness

use std::sync::Arc;

use crate::config::validation::validate_lifecycle;
use crate::config::LifecycleConfig;
use crate::health::LifecycleState;
use crate::http::ProbeServer;
use crate::lifecycle::deadline::{ProcessTerminator, Terminator};
use crate::lifecycle::shutdown::Lifecycle;
use crate::lifecycle::signals;
use crate::lifecycle::LifecycleError;

/// Builder for a [`Lifecycle`].
pub struct LifecycleBuilder {
    config: LifecycleConfig,
    terminator: Arc<dyn Terminator>,
}

impl LifecycleBuilder {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            terminator: Arc::new(ProcessTerminator),
        }
    }

    /// Replace how forced exits end the process.
    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Construct the coordinator: bind the probe server and subscribe to signals.
    pub async fn start(self) -> Result<Lifecycle, LifecycleError> {
        let errors = validate_lifecycle(&self.config);
        if !errors.is_empty() {
            return Err(LifecycleError::InvalidConfig(errors));
        }

        let port = self.config.port;
        let state = Arc::new(LifecycleState::new());
        let transport = ProbeServer::new(state.clone())
            .bind(port)
            .await
            .map_err(|source| LifecycleError::Bind { port, source })?;

        let signal_names = self.config.signals.clone();
        let lifecycle = Lifecycle::new(self.config, state, transport, self.terminator);
        signals::install(&lifecycle, &signal_names)?;

        tracing::info!(
            address = %lifecycle.local_addr(),
            timeout = %lifecycle.config().timeout,
            signals = ?signal_names,
            "Lifecycle coordinator started"
        );

        Ok(lifecycle)
    }
}
