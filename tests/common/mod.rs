//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;

use static_cache::{AssetRegistry, AssetTable, HttpServer, ServerConfig, Shutdown};

/// A running server on an ephemeral port. Dropping it shuts everything down.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub table: AssetTable,
    shutdown: Shutdown,
    _registry: AssetRegistry,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Register the configured assets and start serving them.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let shutdown = Shutdown::new();
    let table = AssetTable::new();
    let registry = AssetRegistry::register(&config.assets, &config.cache, table.clone(), &shutdown)
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, table.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestServer {
        addr,
        client,
        table,
        shutdown,
        _registry: registry,
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

/// Decode a gzip body.
#[allow(dead_code)]
pub fn gunzip(data: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .unwrap();
    out
}
