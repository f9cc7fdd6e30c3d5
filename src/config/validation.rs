//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject duplicate or malformed asset URLs
//! - Validate value ranges (ratio within [0, 1], thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::assets::CATCH_ALL_URL;
use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("asset url {0:?} is registered more than once")]
    DuplicateUrl(String),

    #[error("asset url {0:?} must start with '/' or be '*'")]
    InvalidUrl(String),

    #[error("asset {0:?} has an empty path")]
    EmptyPath(String),

    #[error("min_saved_ratio {0} must be between 0 and 1")]
    InvalidRatio(f64),

    #[error("stream_threshold_bytes must be greater than zero")]
    ZeroStreamThreshold,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for asset in &config.assets {
        if asset.url != CATCH_ALL_URL && !asset.url.starts_with('/') {
            errors.push(ValidationError::InvalidUrl(asset.url.clone()));
        }
        if asset.path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyPath(asset.url.clone()));
        }
        if !seen.insert(asset.url.as_str()) {
            errors.push(ValidationError::DuplicateUrl(asset.url.clone()));
        }
    }

    let ratio = config.cache.min_saved_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::InvalidRatio(ratio));
    }
    if config.cache.stream_threshold_bytes == 0 {
        errors.push(ValidationError::ZeroStreamThreshold);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
