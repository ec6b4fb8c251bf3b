//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Put fingerprint capture in front of the downstream router
//! - Wire up request tracing
//! - Serve plaintext via `axum::serve`, TLS via `axum-server`
//! - Stop accepting on shutdown and drain in-flight requests

use axum::{
    body::Body,
    http::Request,
    response::IntoResponse,
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::analytics::Analytics;
use crate::config::AnalyticsConfig;
use crate::http::middleware::{with_fingerprinting, FingerprintState};
use crate::net::tls::TlsInfoAcceptor;

/// Time allowed for in-flight TLS requests after shutdown is triggered.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP server fronting a downstream router with fingerprint capture.
pub struct HttpServer {
    router: Router,
    config: AnalyticsConfig,
}

impl HttpServer {
    /// Create a new HTTP server. `downstream` receives every request whose
    /// fingerprint was stored.
    pub fn new(config: AnalyticsConfig, analytics: Analytics, downstream: Router) -> Self {
        let state = FingerprintState {
            analytics,
            expose_error_details: config.middleware.expose_error_details,
        };
        let router = Self::build_router(downstream, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(downstream: Router, state: FingerprintState) -> Router {
        with_fingerprinting(downstream, state).layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Serve plaintext HTTP until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires. Requests carry the
    /// negotiated TLS parameters.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind(addr)
            .acceptor(TlsInfoAcceptor::new(tls))
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Downstream router that answers every request with its method and URI.
pub fn echo_router() -> Router {
    Router::new()
        .route("/", any(echo_handler))
        .route("/{*path}", any(echo_handler))
}

async fn echo_handler(request: Request<Body>) -> impl IntoResponse {
    format!("{} {}\n", request.method(), request.uri())
}
