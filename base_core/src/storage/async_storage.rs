use std::sync::Arc;

use super::models::{ContentKind, DownloadResult, FileMetadata, UploadContent, UploadResult};
use super::FileStorage;
use crate::error::{BaseError, Result};

/// Async facade over a blocking [`FileStorage`]. Each call runs on the
/// blocking thread pool; semantics are those of the wrapped storage.
#[derive(Clone)]
pub struct AsyncFileStorage {
    inner: Arc<dyn FileStorage>,
}

impl AsyncFileStorage {
    pub fn new(inner: Arc<dyn FileStorage>) -> Self {
        Self { inner }
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn FileStorage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| BaseError::Internal(format!("Storage task failed: {}", e)))?
    }

    pub async fn upload(
        &self,
        file_id: impl Into<String>,
        content: UploadContent,
        metadata: Option<FileMetadata>,
    ) -> Result<UploadResult> {
        let file_id = file_id.into();
        self.run(move |s| s.upload(&file_id, content, metadata)).await
    }

    pub async fn download(&self, file_id: impl Into<String>, kind: ContentKind) -> Result<DownloadResult> {
        let file_id = file_id.into();
        self.run(move |s| s.download(&file_id, kind)).await
    }

    pub async fn delete(&self, file_id: impl Into<String>) -> Result<bool> {
        let file_id = file_id.into();
        self.run(move |s| s.delete(&file_id)).await
    }

    pub async fn exists(&self, file_id: impl Into<String>) -> Result<bool> {
        let file_id = file_id.into();
        self.run(move |s| s.exists(&file_id)).await
    }

    pub async fn get_metadata(&self, file_id: impl Into<String>) -> Result<Option<FileMetadata>> {
        let file_id = file_id.into();
        self.run(move |s| s.get_metadata(&file_id)).await
    }

    pub async fn list_files(&self, prefix: impl Into<String>, max_results: i64) -> Result<Vec<FileMetadata>> {
        let prefix = prefix.into();
        self.run(move |s| s.list_files(&prefix, max_results)).await
    }

    pub async fn copy(&self, source_id: impl Into<String>, target_id: impl Into<String>) -> Result<UploadResult> {
        let source_id = source_id.into();
        let target_id = target_id.into();
        self.run(move |s| s.copy(&source_id, &target_id)).await
    }
}
