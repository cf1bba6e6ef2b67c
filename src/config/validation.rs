//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (finite timeouts > 0)
//! - Reject duplicate signal subscriptions
//! - Check the observability settings parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::{Config, LifecycleConfig, ObservabilityConfig, ShutdownTimeout, SignalName};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("lifecycle.timeout_ms must be greater than zero (use \"infinite\" to disable it)")]
    ZeroTimeout,

    #[error("lifecycle.signals lists {0} more than once")]
    DuplicateSignal(SignalName),

    #[error("observability.log_level \"{0}\" is not a valid level")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address \"{0}\" is not a socket address")]
    InvalidMetricsAddress(String),
}

pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate the whole configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_lifecycle(&config.lifecycle);
    errors.extend(validate_observability(&config.observability));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks applied to a lifecycle configuration before a coordinator starts.
pub fn validate_lifecycle(config: &LifecycleConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.timeout == ShutdownTimeout::Finite(Duration::ZERO) {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut seen = HashSet::new();
    for signal in &config.signals {
        if !seen.insert(*signal) {
            errors.push(ValidationError::DuplicateSignal(*signal));
        }
    }

    errors
}

fn validate_observability(config: &ObservabilityConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.log_level.clone()));
    }

    if config.metrics_enabled && config.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.metrics_address.clone(),
        ));
    }

    errors
}
