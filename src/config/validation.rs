//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, ports and timeouts
//! - Reject database and table names that are not plain identifiers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AnalyticsConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AnalyticsConfig;
use crate::schema::is_plain_identifier;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AnalyticsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    let store = &config.store;
    if store.scheme != "http" && store.scheme != "https" {
        errors.push(ValidationError::new(
            "store.scheme",
            format!("expected 'http' or 'https', got '{}'", store.scheme),
        ));
    }
    if store.host.trim().is_empty() {
        errors.push(ValidationError::new("store.host", "must not be empty"));
    }
    if store.port == 0 {
        errors.push(ValidationError::new("store.port", "must be non-zero"));
    }
    if !is_plain_identifier(&store.database) {
        errors.push(ValidationError::new(
            "store.database",
            format!("'{}' is not a plain identifier", store.database),
        ));
    }
    if !is_plain_identifier(&store.table) {
        errors.push(ValidationError::new(
            "store.table",
            format!("'{}' is not a plain identifier", store.table),
        ));
    }
    if store.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("store.connect_timeout_secs", "must be > 0"));
    }
    if store.request_timeout_secs == 0 {
        errors.push(ValidationError::new("store.request_timeout_secs", "must be > 0"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
