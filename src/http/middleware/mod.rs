//! Request middleware.

pub mod fingerprint;

pub use fingerprint::{fingerprint_middleware, with_fingerprinting, FingerprintState};
