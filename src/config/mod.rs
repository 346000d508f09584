//! Configuration management for ZipBox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use zipbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `ZIPBOX__<section>__<key>`
//!
//! Examples:
//! - `ZIPBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `ZIPBOX__FETCH__BATCH_SIZE=4`
//! - `ZIPBOX__STORAGE__PROVIDER=local`
//!
//! B2 credentials are only read from `B2_USER` and `B2_KEY`. `B2_BUCKET_ID`
//! and `B2_BUCKET` fill in the bucket when the file does not set it.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/zipbox.toml`.
//! This can be overridden using the `ZIPBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use crate::humanize::ByteSize;
pub use models::{
    Config, FetchConfig, RetentionConfig, ServerConfig, StorageConfig, StorageProvider,
    WebhookConfig, WorkerConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`ZIPBOX__*`, plus `B2_*` secrets)
    /// 2. TOML file (default: `config/zipbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (missing B2 credentials, zero batch size, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// B2 secrets are still taken from the environment, including `.env` in
    /// the working directory or next to `path`.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_with_secrets(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
