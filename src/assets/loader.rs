//! Reading a file into a prospective entry.
//!
//! # Responsibilities
//! - Read the file and resolve its content type
//! - Substitute `{rev}` in HTML before hashing
//! - Compute the ETag (quoted MD5 hex of the served bytes)
//! - Produce a gzip variant when it pays for itself
//! - Decide between in-memory and streamed delivery
//!
//! # Design Decisions
//! - Read errors are returned to the caller, compression errors are swallowed
//! - Compression runs on the blocking pool so reloads never stall the runtime
//! - HTML is never streamed: substituted bytes differ from what is on disk
//! - Streamed files are hashed (and gzipped) chunk by chunk, never held whole
//! - File metadata is taken before the first byte is read, so a rewrite racing
//!   the load leaves a stale modification time and the handler refuses to
//!   serve until the next reload

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

use crate::assets::entry::{Content, LoadedAsset};
use crate::assets::error::AssetError;
use crate::assets::mime;
use crate::config::{AssetConfig, CacheSettings};

/// Placeholder replaced in HTML documents.
pub const REVISION_TOKEN: &str = "{rev}";

const SCAN_CHUNK: usize = 64 * 1024;

/// Process start time in epoch milliseconds, fixed on first use.
pub fn process_revision() -> &'static str {
    static REVISION: OnceLock<String> = OnceLock::new();
    REVISION.get_or_init(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            .to_string()
    })
}

/// Quoted hex MD5 of `data`, usable directly as an `ETag` header value.
pub fn compute_etag(data: &[u8]) -> String {
    quote_digest(Md5::digest(data).as_slice())
}

fn quote_digest(digest: &[u8]) -> String {
    format!("\"{}\"", hex::encode(digest))
}

/// Whether a compression attempt is made for this content type.
pub fn should_compress(content_type: &str, forced: bool) -> bool {
    let essence = mime::essence(content_type);
    forced
        || essence.starts_with("text/")
        || essence == mime::APPLICATION_JAVASCRIPT
        || essence == mime::AUDIO_WAV
}

/// Loads files into [`LoadedAsset`]s.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    revision: Arc<str>,
    stream_threshold: u64,
    min_saved_bytes: u64,
    min_saved_ratio: f64,
}

impl AssetLoader {
    /// Create a loader from the cache settings.
    pub fn new(settings: &CacheSettings) -> Self {
        let revision = match &settings.revision {
            Some(revision) => revision.as_str(),
            None => process_revision(),
        };
        Self {
            revision: Arc::from(revision),
            stream_threshold: settings.stream_threshold_bytes,
            min_saved_bytes: settings.min_saved_bytes,
            min_saved_ratio: settings.min_saved_ratio,
        }
    }

    /// The value substituted for `{rev}`.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Load the file behind `config`.
    pub async fn load(&self, config: &AssetConfig) -> Result<LoadedAsset, AssetError> {
        let path = config.path.as_path();
        let unavailable = |source| AssetError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::open(path).await.map_err(unavailable)?;
        let metadata = file.metadata().await.map_err(unavailable)?;

        let content_type = match &config.content_type {
            Some(content_type) => content_type.clone(),
            None => mime::resolve(path).to_string(),
        };
        let is_html = mime::essence(&content_type) == mime::TEXT_HTML;
        let compress = should_compress(&content_type, config.compress);

        let (content, etag, compressed) = if !is_html && metadata.len() >= self.stream_threshold {
            let modified = metadata.modified().ok();
            let file = file.into_std().await;
            let scan = tokio::task::spawn_blocking(move || scan_file(file, compress))
                .await
                .map_err(|e| unavailable(std::io::Error::other(e)))?
                .map_err(unavailable)?;
            let compressed = match scan.gzip {
                Some(gzip) => self.keep_compressed(path, scan.len as usize, gzip),
                None => None,
            };
            let content = Content::Stream {
                len: scan.len,
                modified,
            };
            (content, scan.etag, compressed)
        } else {
            let mut data = Vec::with_capacity(metadata.len() as usize);
            file.read_to_end(&mut data).await.map_err(unavailable)?;
            let data = if is_html {
                self.substitute_revision(path, data)
            } else {
                Bytes::from(data)
            };
            let etag = compute_etag(&data);
            let compressed = if compress {
                self.compress(path, data.clone()).await
            } else {
                None
            };
            (Content::Memory(data), etag, compressed)
        };

        tracing::debug!(
            path = %path.display(),
            content_type = %content_type,
            bytes = content.len(),
            compressed = compressed.as_ref().map(|c| c.len()),
            streamed = matches!(content, Content::Stream { .. }),
            etag = %etag,
            "Asset loaded"
        );

        Ok(LoadedAsset {
            content_type,
            content,
            compressed,
            etag,
        })
    }

    fn substitute_revision(&self, path: &Path, data: Vec<u8>) -> Bytes {
        match String::from_utf8(data) {
            Ok(text) => Bytes::from(text.replace(REVISION_TOKEN, &self.revision)),
            Err(err) => {
                tracing::debug!(path = %path.display(), "HTML is not UTF-8, skipping {{rev}} substitution");
                Bytes::from(err.into_bytes())
            }
        }
    }

    /// True if a gzip body of `compressed` bytes is worth keeping for `raw` bytes.
    pub fn accepts_compression(&self, raw: usize, compressed: usize) -> bool {
        let raw = raw as u64;
        let compressed = compressed as u64;
        compressed + self.min_saved_bytes < raw
            || (compressed as f64) < raw as f64 * (1.0 - self.min_saved_ratio)
    }

    async fn compress(&self, path: &Path, data: Bytes) -> Option<Bytes> {
        let raw_len = data.len();
        match tokio::task::spawn_blocking(move || gzip(&data)).await {
            Ok(result) => self.keep_compressed(path, raw_len, result),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Compression task failed, serving uncompressed");
                None
            }
        }
    }

    fn keep_compressed(
        &self,
        path: &Path,
        raw_len: usize,
        result: std::io::Result<Vec<u8>>,
    ) -> Option<Bytes> {
        let compressed = match result {
            Ok(compressed) => compressed,
            Err(source) => {
                let err = AssetError::Compression {
                    path: path.to_path_buf(),
                    source,
                };
                tracing::warn!(error = %err, "Serving uncompressed");
                return None;
            }
        };

        if self.accepts_compression(raw_len, compressed.len()) {
            Some(Bytes::from(compressed))
        } else {
            tracing::debug!(
                path = %path.display(),
                raw = raw_len,
                compressed = compressed.len(),
                "Compression ratio too low, discarding gzip variant"
            );
            None
        }
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Result of one pass over a streamed file.
struct Scan {
    len: u64,
    etag: String,
    /// Present when compression was attempted.
    gzip: Option<std::io::Result<Vec<u8>>>,
}

/// Hash a file, and optionally gzip it, one chunk at a time.
fn scan_file(mut file: std::fs::File, compress: bool) -> std::io::Result<Scan> {
    let mut hasher = Md5::new();
    let mut encoder = compress.then(|| GzEncoder::new(Vec::new(), Compression::default()));
    let mut gzip_error = None;
    let mut buf = vec![0u8; SCAN_CHUNK];
    let mut len = 0u64;

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buf[..n];
        hasher.update(chunk);
        len += n as u64;
        if gzip_error.is_none() {
            if let Some(encoder) = encoder.as_mut() {
                if let Err(e) = encoder.write_all(chunk) {
                    gzip_error = Some(e);
                }
            }
        }
    }

    let gzip = match gzip_error {
        Some(e) => Some(Err(e)),
        None => encoder.map(GzEncoder::finish),
    };
    Ok(Scan {
        len,
        etag: quote_digest(hasher.finalize().as_slice()),
        gzip,
    })
}
