//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! fingerprinting service. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Analytical store connection and table settings.
    pub store: StoreConfig,

    /// Per-request middleware behavior.
    pub middleware: MiddlewareConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When set, fingerprints carry the
    /// negotiated protocol version and cipher suite.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Store connection, credentials and table settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `http` or `https`.
    pub scheme: String,

    pub host: String,

    /// HTTP interface port (8123 plain, 8443 TLS by default on ClickHouse).
    pub port: u16,

    pub username: String,

    pub password: String,

    pub database: String,

    /// Table receiving one row per request.
    pub table: String,

    /// Check an existing table's layout at startup.
    pub verify_schema: bool,

    /// Create the table at startup when it does not exist.
    pub create_table_if_missing: bool,

    /// Wrap each write in a server-side transaction. Needs
    /// `allow_experimental_transactions` on the server; when off, the row is
    /// buffered and sent as one INSERT on commit.
    pub server_transactions: bool,

    /// Transport connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Transport per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 8123,
            username: "default".to_string(),
            password: String::new(),
            database: "default".to_string(),
            table: "request_fingerprints".to_string(),
            verify_schema: true,
            create_table_if_missing: true,
            server_transactions: false,
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Base URL of the store's HTTP interface.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}:{}/", self.scheme, self.host, self.port))
    }
}

/// Middleware behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Return the store's error text in 500 responses. Turn off for
    /// internet-facing deployments.
    pub expose_error_details: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            expose_error_details: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
