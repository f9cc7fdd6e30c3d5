//! Conditional request evaluation (304 vs 200).
//!
//! # Design Decisions
//! - `If-Modified-Since` is checked first and wins ties: an entry loaded at or
//!   before the client's timestamp is not modified
//! - `If-None-Match` is an exact string comparison, quotes included
//! - Unparseable validators are ignored, never an error

use std::time::SystemTime;

use axum::http::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use axum::http::HeaderMap;

use crate::assets::AssetEntry;

/// Validators carried by a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validators {
    pub if_modified_since: Option<SystemTime>,
    pub if_none_match: Option<String>,
}

impl Validators {
    /// Extract validators from request headers, dropping malformed values.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_modified_since = headers
            .get(IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| match httpdate::parse_http_date(v) {
                Ok(time) => Some(time),
                Err(_) => {
                    tracing::debug!(value = %v, "Ignoring malformed If-Modified-Since");
                    None
                }
            });
        let if_none_match = headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            if_modified_since,
            if_none_match,
        }
    }
}

/// Outcome of checking a request's validators against an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The client's copy is current; answer 304.
    NotModified,
    /// Send the full representation.
    Modified,
}

/// Decide whether `entry` has changed relative to the client's validators.
pub fn evaluate(entry: &AssetEntry, validators: &Validators) -> Freshness {
    if let Some(since) = validators.if_modified_since {
        if entry.loaded_at <= since {
            return Freshness::NotModified;
        }
    }
    if let Some(tag) = &validators.if_none_match {
        if *tag == entry.etag {
            return Freshness::NotModified;
        }
    }
    Freshness::Modified
}
