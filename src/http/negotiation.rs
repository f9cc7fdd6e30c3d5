//! Content-Encoding negotiation.

use std::time::SystemTime;

use bytes::Bytes;

use crate::assets::{AssetEntry, Content};

/// Encoding marker sent in `Content-Encoding`.
pub const GZIP: &str = "gzip";

/// What to send for a 200 response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Bytes already in memory.
    Bytes(Bytes),
    /// Read `len` bytes from the entry's source file, provided it is still the
    /// version last modified at `modified`.
    Stream {
        len: u64,
        modified: Option<SystemTime>,
    },
}

impl Payload {
    /// Value for `Content-Length`.
    pub fn len(&self) -> u64 {
        match self {
            Payload::Bytes(bytes) => bytes.len() as u64,
            Payload::Stream { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The chosen representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub payload: Payload,
    pub content_encoding: Option<&'static str>,
}

/// True if the `Accept-Encoding` value admits gzip.
///
/// Tokens are compared case-insensitively; `x-gzip` is an alias and `q=0`
/// is a refusal.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|item| {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or("").trim();
        if !(coding.eq_ignore_ascii_case(GZIP) || coding.eq_ignore_ascii_case("x-gzip")) {
            return false;
        }
        !parts.any(|param| {
            let param = param.trim();
            let is_q = param.get(..2).is_some_and(|key| key.eq_ignore_ascii_case("q="));
            is_q && param
                .get(2..)
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        })
    })
}

/// Pick the compressed variant when both sides support it, else the raw content.
///
/// Returns `None` for a missing entry.
pub fn select(entry: &AssetEntry, accept_encoding: Option<&str>) -> Option<Selection> {
    if let (Some(compressed), Some(accept)) = (&entry.compressed, accept_encoding) {
        if accepts_gzip(accept) {
            return Some(Selection {
                payload: Payload::Bytes(compressed.clone()),
                content_encoding: Some(GZIP),
            });
        }
    }

    let payload = match &entry.content {
        Content::Memory(bytes) => Payload::Bytes(bytes.clone()),
        Content::Stream { len, modified } => Payload::Stream {
            len: *len,
            modified: *modified,
        },
        Content::Missing => return None,
    };
    Some(Selection {
        payload,
        content_encoding: None,
    })
}
