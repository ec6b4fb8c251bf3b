//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AnalyticsConfig (validated, immutable)
//!     → store settings handed to Analytics::connect at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the store handle is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, override_table, ConfigError};
pub use schema::AnalyticsConfig;
pub use schema::ListenerConfig;
pub use schema::MiddlewareConfig;
pub use schema::ObservabilityConfig;
pub use schema::StoreConfig;
pub use schema::TlsConfig;
