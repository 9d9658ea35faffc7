//! Blob storage for submission files and review attachments.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Storage backend used by the file and review services.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Bytes>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// `StorageBackend` over any `object_store` implementation.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    fn path(key: &str) -> Result<Path> {
        Path::parse(key).map_err(|e| AppError::Storage(format!("Invalid storage key: {}", e)))
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        let path = Self::path(key)?;
        self.store.put(&path, PutPayload::from(content)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = Self::path(key)?;
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = Self::path(key)?;
        self.store.delete(&path).await?;
        Ok(())
    }
}

/// Build the configured storage backend.
pub fn build_storage(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    let store: Arc<dyn ObjectStore> = match config.storage_backend.as_str() {
        "memory" => Arc::new(InMemory::new()),
        "s3" => {
            let bucket = config.s3_bucket.as_deref().ok_or_else(|| {
                AppError::Config("S3_BUCKET is required when STORAGE_BACKEND=s3".to_string())
            })?;
            let s3 = object_store::aws::AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| AppError::Config(format!("Invalid S3 configuration: {}", e)))?;
            Arc::new(s3)
        }
        _ => {
            std::fs::create_dir_all(&config.storage_path)?;
            let local = LocalFileSystem::new_with_prefix(&config.storage_path)
                .map_err(|e| AppError::Config(format!("Invalid STORAGE_PATH: {}", e)))?;
            Arc::new(local)
        }
    };

    tracing::info!(backend = %config.storage_backend, "Storage backend initialised");
    Ok(Arc::new(ObjectStoreBackend::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = ObjectStoreBackend::in_memory();
        let key = "submissions/abc/review/1700000000000-Manuscript.pdf";

        storage.put(key, Bytes::from_static(b"%PDF-1.7")).await.unwrap();
        assert_eq!(storage.get(key).await.unwrap(), Bytes::from_static(b"%PDF-1.7"));

        storage.delete(key).await.unwrap();
        assert!(matches!(storage.get(key).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = ObjectStoreBackend::in_memory();
        let err = storage.get("submissions/missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_rejects_invalid_key() {
        assert!(ObjectStoreBackend::path("submissions//x").is_err());
        assert!(ObjectStoreBackend::path("submissions/x/../y").is_err());
    }
}
