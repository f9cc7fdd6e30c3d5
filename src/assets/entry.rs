//! The cached representation of one served file.

use std::path::PathBuf;
use std::time::SystemTime;

use bytes::Bytes;

use crate::config::AssetConfig;

/// Where the bytes of an entry live.
#[derive(Debug, Clone)]
pub enum Content {
    /// Held in memory.
    Memory(Bytes),
    /// Read from `source_path` on every request.
    ///
    /// `len` is the size that was hashed and `modified` the file's modification
    /// time before hashing; the file is only served while both still match.
    Stream {
        len: u64,
        modified: Option<SystemTime>,
    },
    /// The backing file could not be read at the last (re)load.
    Missing,
}

impl Content {
    /// Size of the uncompressed content in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Content::Memory(bytes) => bytes.len() as u64,
            Content::Stream { len, .. } => *len,
            Content::Missing => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fields produced by a successful load, before the table timestamps them.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub content_type: String,
    pub content: Content,
    pub compressed: Option<Bytes>,
    pub etag: String,
}

/// Immutable snapshot of one URL. Replaced wholesale on reload, never mutated.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub url: String,
    pub source_path: PathBuf,
    pub content_type: String,
    pub content: Content,
    /// Gzip of the full content; decompresses to exactly the raw bytes.
    pub compressed: Option<Bytes>,
    /// Quoted hex digest of the content.
    pub etag: String,
    /// When this version became current. Doubles as the modification-time validator.
    pub loaded_at: SystemTime,
    /// 0 means no `Cache-Control` directive.
    pub cache_seconds: u64,
}

impl AssetEntry {
    /// Build the entry for a successful load.
    pub fn loaded(config: &AssetConfig, asset: LoadedAsset) -> Self {
        Self {
            url: config.url.clone(),
            source_path: config.path.clone(),
            content_type: asset.content_type,
            content: asset.content,
            compressed: asset.compressed,
            etag: asset.etag,
            loaded_at: SystemTime::now(),
            cache_seconds: config.cache_seconds(),
        }
    }

    /// Build the placeholder for a file that could not be read.
    pub fn missing(config: &AssetConfig) -> Self {
        Self {
            url: config.url.clone(),
            source_path: config.path.clone(),
            content_type: String::new(),
            content: Content::Missing,
            compressed: None,
            etag: String::new(),
            loaded_at: SystemTime::now(),
            cache_seconds: config.cache_seconds(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.content, Content::Missing)
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self.content, Content::Stream { .. })
    }

    /// Size of the uncompressed content in bytes.
    pub fn raw_len(&self) -> u64 {
        self.content.len()
    }
}
