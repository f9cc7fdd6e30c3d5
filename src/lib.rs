//! Static asset cache with conditional delivery.

pub mod assets;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use assets::{AssetRegistry, AssetTable};
pub use config::schema::ServerConfig;
pub use http::{HttpServer, StaticAssets};
pub use lifecycle::Shutdown;
