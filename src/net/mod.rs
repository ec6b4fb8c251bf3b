//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake, records TlsInfo)
//!     → Hand off to HTTP layer (TlsInfo as request extension)
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Handshake results travel with each request, never in shared state

pub mod tls;
