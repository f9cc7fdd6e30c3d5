//! Static asset server.
//!
//! Serves a fixed set of files from memory (large ones streamed from disk),
//! reloading each one when it changes on disk.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    STATIC CACHE                       │
//!                 │                                                       │
//!   files on disk │  ┌─────────┐    ┌─────────┐    ┌──────────────┐      │
//!   ──────────────┼─▶│ watcher │───▶│ loader  │───▶│    table     │      │
//!                 │  │debounce │    │etag/gzip│    │ (arc-swap)   │      │
//!                 │  └─────────┘    └─────────┘    └──────┬───────┘      │
//!                 │                                        │ snapshot     │
//!   Client        │  ┌─────────┐    ┌─────────────┐  ┌────▼────────┐     │
//!   ◀─────────────┼──│response │◀───│ negotiation │◀─│ conditional │◀────┼── Request
//!                 │  └─────────┘    └─────────────┘  └─────────────┘     │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use static_cache::config::{load_config, ServerConfig};
use static_cache::lifecycle::signals::trigger_on_signal;
use static_cache::observability::{logging, metrics};
use static_cache::{AssetRegistry, AssetTable, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "static-cache")]
#[command(about = "Serve a fixed set of files with ETag, gzip and live reload", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_filter);
    tracing::info!("static-cache v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        assets = config.assets.len(),
        request_timeout_secs = config.timeouts.request_secs,
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

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    let table = AssetTable::new();
    let registry = AssetRegistry::register(&config.assets, &config.cache, table.clone(), &shutdown).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, table);
    server.run(listener, shutdown.subscribe()).await?;

    drop(registry);
    tracing::info!("Shutdown complete");
    Ok(())
}
