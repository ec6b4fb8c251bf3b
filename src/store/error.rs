//! Store error definitions.

use std::fmt;
use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by an [`AnalyticsStore`](crate::store::AnalyticsStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never got a response (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with an exception.
    #[error("{0}")]
    Server(ServerException),

    /// A row could not be encoded for transmission.
    #[error("failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    /// The handle could not be built from its settings.
    #[error("invalid store endpoint: {0}")]
    Endpoint(String),

    /// The store answered but the payload could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The connection handle was closed by its owner.
    #[error("connection closed")]
    Closed,
}

impl StoreError {
    /// Shorthand for a server exception without a numeric code.
    pub fn server(message: impl Into<String>) -> Self {
        StoreError::Server(ServerException {
            code: None,
            message: message.into(),
        })
    }

    /// Numeric exception code reported by the store, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            StoreError::Server(e) => e.code,
            _ => None,
        }
    }
}

/// Exception details unwrapped from a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerException {
    pub code: Option<u32>,
    pub message: String,
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}]: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}
