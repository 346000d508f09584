use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "ZIPBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/zipbox.toml";
const ENV_PREFIX: &str = "ZIPBOX";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // ZIPBOX_CONFIG itself may come from .env
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_with_secrets(config_path)
}

/// Same layering as [`load`] for an explicit file
pub fn load_with_secrets(config_path: PathBuf) -> Result<Config, ConfigError> {
    load_dotenv(&config_path);

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// Read `.env` from the working directory, then from the config file's
/// directory. Variables already in the environment are never overridden.
fn load_dotenv(config_path: &Path) {
    let _ = dotenvy::dotenv();

    if let Some(dir) = config_path.parent() {
        let env_file = dir.join(".env");
        if env_file.is_file() {
            if let Err(e) = dotenvy::from_path(&env_file) {
                tracing::warn!("Ignoring unreadable {}: {}", env_file.display(), e);
            }
        }
    }
}

/// Load B2 secrets and bucket fallbacks from the environment.
/// Secrets are never stored in TOML files.
fn load_secrets(config: &mut Config) {
    if let Ok(key_id) = env::var("B2_USER") {
        config.storage.key_id = Some(key_id);
    }
    if let Ok(application_key) = env::var("B2_KEY") {
        config.storage.application_key = Some(application_key);
    }

    if config.storage.bucket_id.is_none() {
        if let Ok(bucket_id) = env::var("B2_BUCKET_ID") {
            config.storage.bucket_id = Some(bucket_id);
        }
    }
    if config.storage.bucket_name.is_none() {
        if let Ok(bucket_name) = env::var("B2_BUCKET") {
            config.storage.bucket_name = Some(bucket_name);
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // ZIPBOX__FETCH__BATCH_SIZE -> fetch.batch_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
