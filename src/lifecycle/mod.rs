//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains
//!             → per-URL reload tasks exit, watches are released
//! ```
//!
//! # Design Decisions
//! - One coordinator, cloned into every long-running task
//! - Built on a watch channel: subscribers created after the trigger still see it

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
