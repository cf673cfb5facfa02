//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the notary client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Socket timeouts applied to every notary connection.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Where Nym records are kept.
    pub storage: StorageConfig,
}

/// Socket options for the encrypted request/reply channel.
///
/// These are process-wide: a connection snapshots them when its socket is
/// created or reset (see [`crate::config::settings`]).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// How long a closing socket may spend flushing, in milliseconds.
    pub linger_ms: u64,

    /// Send deadline in milliseconds (also bounds the lazy dial + handshake).
    pub send_timeout_ms: u64,

    /// Receive deadline in milliseconds.
    pub recv_timeout_ms: u64,
}

impl TransportConfig {
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            linger_ms: 1000,
            send_timeout_ms: 1000,
            recv_timeout_ms: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "compact".
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per Nym.
    pub nym_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            nym_dir: "nyms".to_string(),
        }
    }
}
