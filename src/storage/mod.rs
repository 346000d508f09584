//! Archive storage backends
//!
//! The pipeline talks to storage through [`StoreConnector`], which hands out
//! one connected [`ArchiveStore`] per job. Production uses the Backblaze B2
//! native API ([`b2::B2Client`]); `local` and `memory` providers go through
//! the Apache Arrow `object_store` crate.

pub mod b2;
pub mod object;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

pub use b2::{AccountSession, B2Client, B2Config, B2Connector, UploadCredential};
pub use object::ObjectStoreBackend;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Storage misconfigured: {0}")]
    Misconfigured(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// A connected store that accepts finished archives
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Upload `data` under `destination` and return its public URL
    async fn upload(&self, data: Bytes, destination: &str) -> Result<String>;
}

/// Opens a store connection for a single job
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ArchiveStore>>;
}

/// Percent-encode an object name segment by segment, keeping `/` as the
/// separator. B2 expects this form in `X-Bz-File-Name` and download URLs.
pub fn encode_object_name(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Public download URL: `https://<public_host>/file/<bucket_name>/<name>`
///
/// Derived client-side, so it is only valid if the object was stored under
/// exactly this bucket and name. `name` is percent-encoded here.
pub fn build_url(public_host: &str, bucket_name: &str, name: &str) -> String {
    let host = public_host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!(
        "https://{}/file/{}/{}",
        host,
        encode_object_name(bucket_name),
        encode_object_name(name)
    )
}

/// Build the connector for the configured provider
pub fn connector_from_config(config: &StorageConfig) -> Result<Arc<dyn StoreConnector>> {
    match config.provider {
        StorageProvider::B2 => {
            let b2_config = B2Config::from_storage_config(config)?;
            Ok(Arc::new(B2Connector::new(b2_config)?))
        }
        StorageProvider::Local => Ok(Arc::new(ObjectStoreBackend::local(config)?)),
        StorageProvider::Memory => Ok(Arc::new(ObjectStoreBackend::in_memory(
            &config.public_host,
            config.bucket_name.as_deref().unwrap_or("zipbox-local"),
        ))),
    }
}
