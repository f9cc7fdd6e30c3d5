//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout + trace layers)
//!     → handler.rs (method check, table lookup)
//!     → conditional.rs (304 vs 200)
//!     → negotiation.rs (gzip vs raw)
//!     → response to client, or the host router for anything not ours
//! ```

pub mod conditional;
pub mod handler;
pub mod negotiation;
pub mod server;

pub use handler::{serve_static, Outcome, StaticAssets};
pub use server::HttpServer;
