//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! assets (registration, reloads) ─┐
//!                                  ├→ logging.rs (structured log events)
//! http (every handled request)  ──┘→ metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured fields (url, etag, status) rather than interpolated strings
//! - Metric updates are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
