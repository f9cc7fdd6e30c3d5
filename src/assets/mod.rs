//! Asset cache subsystem.
//!
//! # Data Flow
//! ```text
//! registration (AssetConfig list)
//!     → registry.rs (one task per URL)
//!         → watcher.rs (one shared OS watcher; initial signal, then debounced change signals)
//!         → loader.rs (read → {rev} → ETag → optional gzip)
//!         → table.rs (timestamp, atomic swap of the whole entry)
//!
//! Per request:
//!     http handler → table.rs (lock-free snapshot of one entry)
//! ```
//!
//! # Design Decisions
//! - Entries are immutable; a reload builds a new one and swaps it in
//! - A file that cannot be read is kept as a *missing* entry (404), not removed,
//!   so a later write brings the URL back without re-registration
//! - Reloads for one URL run sequentially in its own task; URLs reload independently

pub mod entry;
pub mod error;
pub mod loader;
pub mod mime;
pub mod registry;
pub mod table;
pub mod watcher;

pub use entry::{AssetEntry, Content, LoadedAsset};
pub use error::AssetError;
pub use loader::{compute_etag, AssetLoader, REVISION_TOKEN};
pub use registry::AssetRegistry;
pub use table::AssetTable;
pub use watcher::{FileWatch, WatchHub};

/// Registration URL that answers every path without its own entry.
pub const CATCH_ALL_URL: &str = "*";
