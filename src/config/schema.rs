//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the asset server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Cache lifetime used when an asset is configured with a negative `cache` value.
pub const DEFAULT_LONG_CACHE_SECS: u64 = 31_536_000;

/// Root configuration for the asset server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered asset registrations, one per served URL.
    pub assets: Vec<AssetConfig>,

    /// Loader, compression and watcher tuning.
    pub cache: CacheSettings,

    /// What to do with methods other than GET and HEAD.
    pub methods: MethodsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One served file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Request path this asset answers for, or `*` for the catch-all.
    pub url: String,

    /// File backing the asset.
    pub path: PathBuf,

    /// Explicit content type; resolved from the file suffix when absent.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Client cache lifetime in seconds.
    /// Omitted or zero disables `Cache-Control`, negative means one year.
    #[serde(default)]
    pub cache: Option<i64>,

    /// Attempt gzip regardless of content type.
    #[serde(default)]
    pub compress: bool,
}

impl AssetConfig {
    /// Create a registration for `url` backed by `path` with no overrides.
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            content_type: None,
            cache: None,
            compress: false,
        }
    }

    /// Set the client cache lifetime.
    pub fn with_cache(mut self, seconds: i64) -> Self {
        self.cache = Some(seconds);
        self
    }

    /// Override the resolved content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Force a compression attempt.
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Normalized cache lifetime: 0 means no explicit directive.
    pub fn cache_seconds(&self) -> u64 {
        match self.cache {
            None | Some(0) => 0,
            Some(secs) if secs < 0 => DEFAULT_LONG_CACHE_SECS,
            Some(secs) => secs as u64,
        }
    }
}

/// Loader, compression and watcher tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Files at least this large are streamed from disk instead of held in memory.
    pub stream_threshold_bytes: u64,

    /// A gzip variant is kept if it saves at least this many bytes...
    pub min_saved_bytes: u64,

    /// ...or at least this fraction of the original size.
    pub min_saved_ratio: f64,

    /// Quiet period before a burst of change notifications triggers a reload.
    pub debounce_ms: u64,

    /// Value substituted for `{rev}` in HTML. Defaults to the process start time.
    pub revision: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stream_threshold_bytes: 200 * 1024,
            min_saved_bytes: 1024,
            min_saved_ratio: 0.10,
            debounce_ms: 25,
            revision: None,
        }
    }
}

/// Handling of methods other than GET and HEAD.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MethodPolicy {
    /// Answer 405 Method Not Allowed.
    #[default]
    Reject,
    /// Pass the request on to the host's fallback.
    Delegate,
}

/// Method handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MethodsConfig {
    pub policy: MethodPolicy,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address the exporter listens on.
    pub metrics_address: String,

    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            log_filter: "static_cache=info,tower_http=info".to_string(),
        }
    }
}
