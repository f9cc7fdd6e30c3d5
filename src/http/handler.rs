//! Per-request handling of registered assets.
//!
//! # Flow
//! ```text
//! METHOD_CHECK ──(not GET/HEAD)──→ 405 or delegate, per MethodPolicy
//!      ↓
//! LOOKUP ──(no entry, no catch-all)──→ delegate to the host's next handler
//!      ↓        └──(missing entry)──→ 404
//! CONDITIONAL_CHECK ──(not modified)──→ 304
//!      ↓
//! NEGOTIATE (gzip or raw)
//!      ↓
//! RESPOND (200; HEAD keeps headers, drops body)
//! ```
//!
//! # Design Decisions
//! - Each request reads one entry snapshot and uses it throughout
//! - Nothing here writes to the table
//! - Streamed entries are piped from disk; hyper polls the stream only as fast
//!   as the client drains it, and dropping the body closes the file

use std::time::{Instant, SystemTime};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    HeaderName, ACCEPT_ENCODING, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_TYPE, ETAG, RETRY_AFTER, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

use crate::assets::{AssetEntry, AssetTable};
use crate::config::MethodPolicy;
use crate::http::conditional::{evaluate, Freshness, Validators};
use crate::http::negotiation::{select, Payload};
use crate::observability::metrics;

const STREAM_CHUNK: usize = 64 * 1024;

/// Result of handling a request.
pub enum Outcome {
    /// The request was answered here.
    Respond(Response),
    /// Not ours; the host should run its next handler.
    Delegate(Request),
}

/// Serves the entries of an [`AssetTable`].
#[derive(Clone)]
pub struct StaticAssets {
    table: AssetTable,
    method_policy: MethodPolicy,
}

impl StaticAssets {
    pub fn new(table: AssetTable, method_policy: MethodPolicy) -> Self {
        Self {
            table,
            method_policy,
        }
    }

    /// Mount in front of `router`: its routes and fallback become the
    /// delegate for requests no asset answers.
    pub fn layer(self, router: Router) -> Router {
        router.layer(from_fn_with_state(self, serve_static))
    }

    /// Handle one request.
    pub async fn handle(&self, request: Request) -> Outcome {
        let start = Instant::now();
        let method = request.method().clone();

        let outcome = self.dispatch(request).await;
        if let Outcome::Respond(response) = &outcome {
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
        }
        outcome
    }

    async fn dispatch(&self, request: Request) -> Outcome {
        let method = request.method().clone();
        if method != Method::GET && method != Method::HEAD {
            return match self.method_policy {
                MethodPolicy::Delegate => Outcome::Delegate(request),
                MethodPolicy::Reject => {
                    tracing::debug!(method = %method, path = %request.uri().path(), "Method not allowed");
                    Outcome::Respond(method_not_allowed())
                }
            };
        }
        let head = method == Method::HEAD;

        let Some(entry) = self.table.resolve(request.uri().path()) else {
            return Outcome::Delegate(request);
        };
        if entry.is_missing() {
            tracing::debug!(url = %entry.url, "Backing file missing");
            return Outcome::Respond(not_found());
        }

        let validators = Validators::from_headers(request.headers());
        if evaluate(&entry, &validators) == Freshness::NotModified {
            tracing::debug!(url = %entry.url, etag = %entry.etag, "Not modified");
            return Outcome::Respond(not_modified(&entry));
        }

        let accept_encoding = request
            .headers()
            .get(ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok());
        let Some(selection) = select(&entry, accept_encoding) else {
            return Outcome::Respond(not_found());
        };

        let mut headers = validator_headers(&entry);
        insert(&mut headers, CONTENT_TYPE, &entry.content_type);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(selection.payload.len()));
        if let Some(encoding) = selection.content_encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        }

        let body = if head {
            Body::empty()
        } else {
            match selection.payload {
                Payload::Bytes(bytes) => Body::from(bytes),
                Payload::Stream { len, modified } => match open_stream(&entry, len, modified).await {
                    Ok(body) => body,
                    Err(response) => return Outcome::Respond(response),
                },
            }
        };

        tracing::debug!(
            url = %entry.url,
            etag = %entry.etag,
            encoding = selection.content_encoding.unwrap_or("identity"),
            head,
            "Serving asset"
        );
        let mut response = Response::new(body);
        *response.headers_mut() = headers;
        Outcome::Respond(response)
    }
}

/// Axum middleware adapter for [`StaticAssets`].
pub async fn serve_static(
    State(assets): State<StaticAssets>,
    request: Request,
    next: Next,
) -> Response {
    match assets.handle(request).await {
        Outcome::Respond(response) => response,
        Outcome::Delegate(request) => next.run(request).await,
    }
}

/// Headers shared by 200 and 304 responses.
fn validator_headers(entry: &AssetEntry) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, ETAG, &entry.etag);
    if entry.cache_seconds > 0 {
        insert(&mut headers, CACHE_CONTROL, &format!("max-age={}", entry.cache_seconds));
    }
    if entry.compressed.is_some() {
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
    headers
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value = %value, "Dropping invalid header value"),
    }
}

async fn open_stream(
    entry: &AssetEntry,
    len: u64,
    modified: Option<SystemTime>,
) -> Result<Body, Response> {
    let file = match tokio::fs::File::open(&entry.source_path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(url = %entry.url, error = %e, "Streamed file vanished");
            return Err(not_found());
        }
    };
    match file.metadata().await {
        Ok(meta) if meta.len() == len && meta.modified().ok() == modified => {}
        Ok(meta) => {
            tracing::debug!(
                url = %entry.url,
                expected = len,
                actual = meta.len(),
                "Streamed file changed since load"
            );
            return Err(reload_pending());
        }
        Err(e) => {
            tracing::warn!(url = %entry.url, error = %e, "Cannot stat streamed file");
            return Err(not_found());
        }
    }
    Ok(stream_body(file, len))
}

/// A body yielding at most `len` bytes of `reader`, one chunk per poll.
fn stream_body<R>(reader: R, len: u64) -> Body
where
    R: AsyncRead + Send + 'static,
{
    Body::from_stream(ReaderStream::with_capacity(reader.take(len), STREAM_CHUNK))
}

fn not_modified(entry: &AssetEntry) -> Response {
    (StatusCode::NOT_MODIFIED, validator_headers(entry)).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, HeaderValue::from_static("GET, HEAD"))],
    )
        .into_response()
}

fn reload_pending() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(RETRY_AFTER, HeaderValue::from_static("1"))],
    )
        .into_response()
}
