//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::lifecycle::signals::Signal;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and shutdown settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub logging: LogConfig,

    /// Signals that trigger shutdown.
    pub signals: SignalConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Time granted to in-flight requests after shutdown starts (0 = unbounded).
    pub shutdown_timeout_ms: u64,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            shutdown_timeout_ms: 5_000,
            request_timeout_secs: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Enable the verbose log family.
    pub verbose: bool,

    /// Prepended to every line written by the logging facade.
    pub prefix: String,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Signal configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    pub shutdown: Vec<Signal>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            shutdown: Signal::SHUTDOWN.to_vec(),
        }
    }
}
