//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, plaintext or TLS serving)
//!     → middleware/fingerprint.rs (extract + transactional write)
//!         ├─ write failed → 500 to client
//!         └─ write ok → downstream router, request untouched
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{with_fingerprinting, FingerprintState};
pub use server::HttpServer;
