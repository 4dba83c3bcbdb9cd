//! xkmini-web - comic viewer with local favorites
//!
//! Settings come from the command line, the environment, an optional TOML
//! file, then built-in defaults, in that order.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use xkmini_common::config::{AppConfig, ConfigOverrides};
use xkmini_common::db::FavoritesStore;
use xkmini_common::logging::init_logging;
use xkmini_web::services::{ComicLookup, UpstreamClient};
use xkmini_web::{build_router, AppState};

/// Command-line arguments for xkmini-web
#[derive(Parser, Debug)]
#[command(name = "xkmini-web")]
#[command(about = "Comic viewer with a local favorites list")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "XKMINI_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "XKMINI_BIND")]
    bind: Option<String>,

    /// Favorites database file
    #[arg(long, env = "FAVORITES_DB")]
    db_path: Option<PathBuf>,

    /// Flat log file
    #[arg(long, env = "XKMINI_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Base URL of the comic JSON source
    #[arg(long, env = "XKMINI_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, env = "XKMINI_UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: Option<u64>,

    /// TOML config file
    #[arg(short, long, env = "XKMINI_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            port: self.port,
            db_path: self.db_path.clone(),
            log_file: self.log_file.clone(),
            upstream_url: self.upstream_url.clone(),
            upstream_timeout_secs: self.upstream_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::resolve(args.overrides(), args.config.as_deref())
        .context("Failed to load configuration")?;

    // Flushes the log file on drop
    let _log_guard = init_logging(&config.log_file).context("Failed to initialize logging")?;

    info!(
        "Starting xkmini-web v{} (log file {})",
        env!("CARGO_PKG_VERSION"),
        config.log_file.display()
    );
    info!("Favorites database: {}", config.db_path.display());

    let store = FavoritesStore::open(&config.db_path, config.max_connections, config.retry)
        .await
        .context("Failed to open favorites database")?;
    let store = Arc::new(store);

    let client = UpstreamClient::new(&config.upstream_url, config.upstream_timeout)
        .context("Failed to build upstream client")?;
    info!(
        "Comic source: {} (timeout {:?})",
        config.upstream_url, config.upstream_timeout
    );

    let lookup = ComicLookup::new(Arc::new(client));
    let state = AppState::new(store.clone(), lookup).context("Failed to compile templates")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.bind, config.port))?;
    let addr: SocketAddr = listener.local_addr().context("Listener has no local address")?;
    info!("xkmini-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
