//! Per-request fingerprint capture.
//!
//! # Data Flow
//! ```text
//! http::Request (headers, ConnectInfo, TlsInfo)
//!     → extract.rs (pure field reads, defaults)
//!     → Fingerprint (owned, immutable)
//!     → schema::row (ordered cells)
//!     → analytics writer
//! ```
//!
//! # Design Decisions
//! - Extraction is total: every missing header becomes an empty string
//! - One fingerprint per request, never batched or deduplicated

pub mod extract;

pub use extract::extract;

/// Metadata captured from a single inbound request.
///
/// Built once by [`extract`] and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    /// Peer address as `ip:port`.
    pub ip_address: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub accept_charset: String,
    pub accept: String,
    pub connection: String,
    pub host: String,
    pub x_forwarded_for: String,
    pub referer: String,
    pub cookie: String,
    pub dnt: String,
    pub upgrade_insecure_requests: String,
    pub cache_control: String,
    pub pragma: String,
    pub via: String,
    pub forwarded: String,
    pub x_real_ip: String,
    pub x_forwarded_proto: String,
    pub x_forwarded_host: String,
    pub x_forwarded_port: String,
    pub x_amz_date: String,
    pub x_api_key: String,
    pub x_request_id: String,
    pub authorization: String,
    pub content_type: String,
    /// Declared body length, `-1` when unknown (chunked or unparsable).
    pub content_length: i64,
    pub method: String,
    pub request_uri: String,
    pub protocol: String,
    pub transfer_encoding: Vec<String>,
    /// IANA protocol version identifier, `0` for plaintext connections.
    pub tls_version: u16,
    /// IANA cipher suite identifier, `0` for plaintext connections.
    pub tls_cipher_suite: u16,
}
