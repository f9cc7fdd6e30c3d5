//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the asset layer in front of the host routes
//! - Wire up middleware (tracing, request timeout)
//! - Bind server to listener and drain on shutdown

use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::assets::AssetTable;
use crate::config::ServerConfig;
use crate::http::handler::StaticAssets;
use crate::lifecycle::ShutdownSignal;

/// HTTP server for registered assets.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server answering only for the assets in `table`.
    pub fn new(config: ServerConfig, table: AssetTable) -> Self {
        Self::with_host(config, table, Router::new())
    }

    /// Create a server whose unmatched requests fall through to `host`.
    pub fn with_host(config: ServerConfig, table: AssetTable, host: Router) -> Self {
        let assets = StaticAssets::new(table, config.methods.policy);
        let router = Self::build_router(&config, assets, host);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, assets: StaticAssets, host: Router) -> Router {
        assets
            .layer(host)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            method_policy = ?self.config.methods.policy,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
