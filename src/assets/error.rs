//! Asset subsystem errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or watching an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The backing file could not be read. Contained to one URL.
    #[error("source {path:?} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS change watcher could not be created.
    #[error("cannot start file watcher: {source}")]
    WatcherInit {
        #[source]
        source: notify::Error,
    },

    /// The OS refused a change watch for a reason other than a missing path.
    #[error("cannot watch {path:?}: {source}")]
    WatchRegistration {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Producing the gzip variant failed. Never fatal to a load.
    #[error("compression of {path:?} failed: {source}")]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
