//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (write counters, latency histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with key/value fields
//! - Metrics are cheap (atomic increments) and no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
