use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fetch.batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("Timeout must be positive: {field}")]
    InvalidTimeout { field: String },

    #[error("worker.workers and worker.channel_size must be at least 1")]
    InvalidWorkerPool,

    #[error("Storage provider is B2 but missing credentials (B2_USER or B2_KEY)")]
    MissingB2Credentials,

    #[error("Storage provider is B2 but {field} is not set")]
    MissingBucket { field: String },

    #[error("storage.public_host must not be empty")]
    EmptyPublicHost,

    #[error("Retention TTL must be positive: {field} = {value}")]
    InvalidRetentionTTL { field: String, value: u32 },

    #[error("server.max_urls_per_job must be at least 1")]
    InvalidUrlLimit,

    #[error("worker.archive_compression_level must be between 1 and 9, got {0}")]
    InvalidCompressionLevel(i64),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_fetch(config)?;
    validate_timeouts(config)?;
    validate_worker(config)?;
    validate_storage(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize);
    }

    if config.server.max_urls_per_job == 0 {
        return Err(ValidationError::InvalidUrlLimit);
    }

    Ok(())
}

fn validate_timeouts(config: &Config) -> Result<(), ValidationError> {
    let timeouts = [
        ("fetch.request_timeout_secs", config.fetch.request_timeout_secs),
        ("webhook.timeout_secs", config.webhook.timeout_secs),
        ("storage.request_timeout_secs", config.storage.request_timeout_secs),
    ];

    for (field, value) in timeouts {
        if value == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    if config.worker.workers == 0 || config.worker.channel_size == 0 {
        return Err(ValidationError::InvalidWorkerPool);
    }
    if let Some(level) = config.worker.archive_compression_level {
        if !(1..=9).contains(&level) {
            return Err(ValidationError::InvalidCompressionLevel(level));
        }
    }
    Ok(())
}

/// Validate bucket and credentials when provider is B2
fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.public_host.trim().is_empty() {
        return Err(ValidationError::EmptyPublicHost);
    }

    if config.storage.provider != StorageProvider::B2 {
        return Ok(());
    }

    if config.storage.key_id.is_none() || config.storage.application_key.is_none() {
        return Err(ValidationError::MissingB2Credentials);
    }

    if config.storage.bucket_id.is_none() {
        return Err(ValidationError::MissingBucket {
            field: "storage.bucket_id".to_string(),
        });
    }

    if config.storage.bucket_name.is_none() {
        return Err(ValidationError::MissingBucket {
            field: "storage.bucket_name".to_string(),
        });
    }

    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.retention.job_ttl_days == 0 {
        return Err(ValidationError::InvalidRetentionTTL {
            field: "job_ttl_days".to_string(),
            value: 0,
        });
    }

    Ok(())
}
