//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every field falls back to its default when omitted.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Probe server, signals and shutdown timeout.
    pub lifecycle: LifecycleConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Lifecycle coordinator configuration.
///
/// Overrides merge onto the defaults:
/// ```
/// use lifecycle_probe::config::{LifecycleConfig, ShutdownTimeout};
///
/// let config = LifecycleConfig {
///     port: 0,
///     timeout: ShutdownTimeout::Infinite,
///     ..Default::default()
/// };
/// assert_eq!(config.signals.len(), 3);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Port the probe server listens on (0 picks an ephemeral port).
    pub port: u16,

    /// OS signals that trigger shutdown.
    pub signals: Vec<SignalName>,

    /// Time allowed for the whole shutdown sequence before the process is
    /// forcibly terminated.
    #[serde(rename = "timeout_ms")]
    pub timeout: ShutdownTimeout,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            signals: vec![SignalName::Sigterm, SignalName::Sighup, SignalName::Sigint],
            timeout: ShutdownTimeout::default(),
        }
    }
}

/// Global shutdown deadline.
///
/// Deserializes from a millisecond count or the string `"infinite"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTimeout {
    Finite(Duration),
    /// Disables the global force-kill timer.
    Infinite,
}

impl ShutdownTimeout {
    pub const fn from_millis(ms: u64) -> Self {
        ShutdownTimeout::Finite(Duration::from_millis(ms))
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ShutdownTimeout::Finite(duration) => Some(*duration),
            ShutdownTimeout::Infinite => None,
        }
    }
}

impl Default for ShutdownTimeout {
    fn default() -> Self {
        ShutdownTimeout::from_millis(60_000)
    }
}

impl fmt::Display for ShutdownTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTimeout::Finite(duration) => write!(f, "{}ms", duration.as_millis()),
            ShutdownTimeout::Infinite => f.write_str("infinite"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeoutRepr {
    Millis(u64),
    Keyword(String),
}

impl<'de> Deserialize<'de> for ShutdownTimeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TimeoutRepr::deserialize(deserializer)? {
            TimeoutRepr::Millis(ms) => Ok(ShutdownTimeout::from_millis(ms)),
            TimeoutRepr::Keyword(word) if word.eq_ignore_ascii_case("infinite") => {
                Ok(ShutdownTimeout::Infinite)
            }
            TimeoutRepr::Keyword(word) => Err(serde::de::Error::custom(format!(
                "expected milliseconds or \"infinite\", got \"{}\"",
                word
            ))),
        }
    }
}

impl Serialize for ShutdownTimeout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ShutdownTimeout::Finite(duration) => {
                serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            ShutdownTimeout::Infinite => serializer.serialize_str("infinite"),
        }
    }
}

/// An OS signal that can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignalName {
    Sigterm,
    Sigint,
    Sighup,
    Sigquit,
    Sigusr1,
    Sigusr2,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Sigterm => "SIGTERM",
            SignalName::Sigint => "SIGINT",
            SignalName::Sighup => "SIGHUP",
            SignalName::Sigquit => "SIGQUIT",
            SignalName::Sigusr1 => "SIGUSR1",
            SignalName::Sigusr2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = String;

    /// Accepts `SIGTERM` as well as `TERM`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "TERM" => Ok(SignalName::Sigterm),
            "INT" => Ok(SignalName::Sigint),
            "HUP" => Ok(SignalName::Sighup),
            "QUIT" => Ok(SignalName::Sigquit),
            "USR1" => Ok(SignalName::Sigusr1),
            "USR2" => Ok(SignalName::Sigusr2),
            _ => Err(format!("unknown signal \"{}\"", s)),
        }
    }
}

impl TryFrom<String> for SignalName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignalName> for String {
    fn from(value: SignalName) -> Self {
        value.as_str().to_string()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
