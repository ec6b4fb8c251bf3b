//! Request fingerprint analytics server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │              FINGERPRINT ANALYTICS               │
//!                       │                                                  │
//!   Client Request      │  ┌─────────┐   ┌──────────────┐   ┌──────────┐   │
//!   ────────────────────┼─▶│  net    │──▶│ middleware   │──▶│downstream│   │
//!                       │  │TLS info │   │ extract+write│   │ handler  │   │
//!                       │  └─────────┘   └──────┬───────┘   └──────────┘   │
//!                       │                       │ one row / request        │
//!                       │                       ▼                          │
//!                       │                ┌──────────────┐                  │
//!                       │                │  analytics   │                  │
//!                       │                │ store handle │                  │
//!                       │                └──────┬───────┘                  │
//!                       └───────────────────────┼──────────────────────────┘
//!                                               ▼
//!                                         ClickHouse (HTTP)
//! ```
//!
//! Startup reconciles the target table (verify, then create if missing)
//! before the listener accepts traffic.

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;

use fingerprint_analytics::config::{load_config, AnalyticsConfig};
use fingerprint_analytics::http::server::echo_router;
use fingerprint_analytics::net::tls::load_tls_config;
use fingerprint_analytics::observability::{logging, metrics};
use fingerprint_analytics::{Analytics, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "fingerprint-analytics")]
#[command(about = "Store a fingerprint of every HTTP request in ClickHouse", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalyticsConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("fingerprint-analytics v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        store_host = %config.store.host,
        store_port = config.store.port,
        table = %config.store.table,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Fail fast: no traffic until the table is usable.
    let analytics = Analytics::connect(&config.store).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let bind_address: SocketAddr = config.listener.bind_address.parse()?;
    let server = HttpServer::new(config, analytics.clone(), echo_router());
    let tls = server.config().listener.tls.clone();

    let served = match tls {
        Some(tls) => {
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            server.run_tls(bind_address, rustls, shutdown.subscribe()).await
        }
        None => {
            let listener = TcpListener::bind(bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await
        }
    };

    if let Err(e) = analytics.close().await {
        tracing::warn!(error = %e, "Failed to close analytics store");
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
