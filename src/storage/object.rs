//! `object_store`-backed archive storage for local and in-memory providers

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{ObjectStore, path::Path as StoragePath};
use std::sync::Arc;

use super::{ArchiveStore, Result, StorageError, StoreConnector, build_url};
use crate::config::StorageConfig;
use crate::humanize::ByteSize;

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    public_host: String,
    bucket: String,
}

impl ObjectStoreBackend {
    /// Create storage over any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, public_host: &str, bucket: &str) -> Self {
        Self {
            store,
            public_host: public_host.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory(public_host: &str, bucket: &str) -> Self {
        Self::new(
            Arc::new(object_store::memory::InMemory::new()),
            public_host,
            bucket,
        )
    }

    /// Filesystem storage rooted at `storage.local_root`
    pub fn local(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.local_root).map_err(|e| {
            StorageError::Misconfigured(format!(
                "cannot create {}: {e}",
                config.local_root.display()
            ))
        })?;

        let store = object_store::local::LocalFileSystem::new_with_prefix(&config.local_root)?;
        let bucket = config.bucket_name.as_deref().unwrap_or("zipbox-local");

        Ok(Self::new(Arc::new(store), &config.public_host, bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read an object back, mostly useful in tests and tooling
    pub async fn download(&self, key: &str) -> Result<Bytes> {
        let result = self.store.get(&StoragePath::from(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&StoragePath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArchiveStore for ObjectStoreBackend {
    async fn upload(&self, data: Bytes, destination: &str) -> Result<String> {
        let size = data.len() as u64;

        self.store
            .put(&StoragePath::from(destination), data.into())
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::info!(key = destination, size = %ByteSize(size), "Uploaded to storage");

        Ok(build_url(&self.public_host, &self.bucket, destination))
    }
}

#[async_trait]
impl StoreConnector for ObjectStoreBackend {
    async fn connect(&self) -> Result<Box<dyn ArchiveStore>> {
        Ok(Box::new(self.clone()))
    }
}
