//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the capture proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every request is relayed to.
    pub destination: DestinationConfig,

    /// Upstream timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream connection pool sizing.
    pub pool: PoolConfig,

    /// Inbound limits.
    pub limits: LimitsConfig,

    /// Log output and record settings.
    pub logging: LoggingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream destination.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DestinationConfig {
    /// Scheme and authority prefix, e.g. "http://127.0.0.1:9000".
    /// The inbound path and query are appended verbatim.
    pub host: String,
}

/// Upstream timeouts, in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout.
    pub connect_ms: u64,

    /// Time allowed for the upstream to answer and deliver its body.
    pub response_ms: u64,

    /// Time allowed to wait for a free pooled connection.
    pub connection_request_ms: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    pub fn connection_request(&self) -> Duration {
        Duration::from_millis(self.connection_request_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 15_000,
            response_ms: 30_000,
            connection_request_ms: 15_000,
        }
    }
}

/// Upstream connection pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum connections across all routes.
    pub max_total_connections: usize,

    /// Maximum connections to one route (scheme, host and port).
    pub max_connections_per_route: usize,

    /// Idle connection lifetime in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total_connections: 200,
            max_connections_per_route: 20,
            idle_timeout_secs: 90,
        }
    }
}

impl PoolConfig {
    /// Connections the single destination route may hold at once.
    pub fn route_limit(&self) -> usize {
        self.max_total_connections.min(self.max_connections_per_route)
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest inbound body the proxy will capture.
    pub max_request_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Cap on the body bytes copied into a record. 0 disables the cap.
    pub max_body_bytes: usize,

    /// Render record timestamps in UTC instead of local time.
    pub utc_timestamps: bool,
}

impl LoggingConfig {
    /// The loggable-body cap, `None` when unlimited.
    pub fn body_limit(&self) -> Option<usize> {
        (self.max_body_bytes > 0).then_some(self.max_body_bytes)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            max_body_bytes: 1024 * 1024,
            utc_timestamps: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
