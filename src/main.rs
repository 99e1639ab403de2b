//! Download proxy.
//!
//! Fetches a file from the URL carried in the request path and hands it back
//! with browser-friendly headers, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  DOWNLOAD PROXY                  │
//!                          │                                                  │
//!   GET /<encoded URL>     │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!   ───────────────────────┼─▶│  http   │───▶│  target  │───▶│   policy   │   │
//!                          │  │ server  │    │  decode  │    │ allow-list │   │
//!                          │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                          │                                       │          │
//!                          │                                       ▼          │
//!   Response               │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!   ◀──────────────────────┼──│  http   │◀───│  adapt   │◀───│  upstream  │◀──┼── Origin
//!                          │  │ server  │    │CORS/HTML │    │   fetch    │   │   server
//!                          │  └─────────┘    └──────────┘    └────────────┘   │
//!                          │                                                  │
//!                          │  config (TOML + hot reload) · observability ·    │
//!                          │  lifecycle (signals, graceful shutdown)          │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use download_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use download_proxy::config::watcher::ConfigWatcher;
use download_proxy::lifecycle::{signals, Shutdown};
use download_proxy::observability;
use download_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "download-proxy")]
#[command(about = "HTTP download proxy with CORS and Content-Disposition rewriting", long_about = None)]
struct Args {
    /// TOML configuration file. Watched for changes while running.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    observability::logging::init(&config.observability);

    tracing::info!("download-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        variant = ?config.policy.variant,
        allowed_hosts = ?config.policy.allowed_hosts,
        passthrough_prefixes = config.policy.passthrough_prefixes.len(),
        rewrite = config.rewrite.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = observability::metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server for reloads to keep arriving.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload unavailable");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::install(shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
