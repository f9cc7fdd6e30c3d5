//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, resolve relative asset paths)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → assets registered, HTTP server built
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; asset *content* reloads, the asset list does not
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AssetConfig, CacheSettings, ListenerConfig, MethodPolicy, MethodsConfig,
    ObservabilityConfig, ServerConfig, TimeoutConfig,
};
pub use validation::ValidationError;
