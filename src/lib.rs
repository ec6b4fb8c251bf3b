//! Request fingerprint analytics for axum services.
//!
//! Captures per-request metadata (headers, peer and TLS attributes) and
//! stores one row per request in a ClickHouse table.

pub mod analytics;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod schema;
pub mod store;

pub use analytics::Analytics;
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, WriteStage};
pub use fingerprint::Fingerprint;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
