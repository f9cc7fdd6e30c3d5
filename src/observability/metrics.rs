//! Metrics collection and exposition.
//!
//! # Metrics
//! - `static_requests_total` (counter): handled requests by method, status
//! - `static_request_duration_seconds` (histogram): time to build the response
//! - `static_reloads_total` (counter): reload outcomes (`loaded` / `missing`)
//! - `static_compressed_bytes_saved` (gauge): bytes saved by the gzip variant, per URL

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "static_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("static_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    counter!("static_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_compression(url: &str, raw: u64, compressed: Option<u64>) {
    let saved = compressed.map(|c| raw.saturating_sub(c)).unwrap_or(0);
    gauge!("static_compressed_bytes_saved", "url" => url.to_string()).set(saved as f64);
}
