//! TLS configuration, certificate loading and per-connection session data.

use axum::{middleware::AddExtension, Extension};
use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures_util::future::BoxFuture;
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls::ServerConnection;
use tokio_rustls::server::TlsStream;
use tower::Layer;

/// Negotiated parameters of a TLS connection, attached to every request
/// served over it. Plaintext connections carry no `TlsInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlsInfo {
    /// IANA protocol version (`0x0303` TLS 1.2, `0x0304` TLS 1.3).
    pub version: u16,
    /// IANA cipher suite identifier.
    pub cipher_suite: u16,
}

impl TlsInfo {
    fn from_session(session: &ServerConnection) -> Self {
        Self {
            version: session.protocol_version().map(u16::from).unwrap_or(0),
            cipher_suite: session
                .negotiated_cipher_suite()
                .map(|suite| u16::from(suite.suite()))
                .unwrap_or(0),
        }
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Rustls acceptor that exposes the handshake result to request handlers
/// through a [`TlsInfo`] extension.
#[derive(Clone)]
pub struct TlsInfoAcceptor {
    inner: RustlsAcceptor,
}

impl TlsInfoAcceptor {
    pub fn new(config: RustlsConfig) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
        }
    }
}

impl<I, S> Accept<I, S> for TlsInfoAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, TlsInfo>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();

        Box::pin(async move {
            let (stream, service) = acceptor.accept(stream, service).await?;
            let info = TlsInfo::from_session(stream.get_ref().1);
            tracing::trace!(
                tls_version = info.version,
                tls_cipher_suite = info.cipher_suite,
                "TLS handshake complete"
            );
            Ok((stream, Extension(info).layer(service)))
        })
    }
}
