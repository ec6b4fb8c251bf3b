//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main):
//!     Load config → Connect + reconcile schema → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Close store handle
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The store handle is closed once, after the server has drained

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
