//! File storage behind a provider abstraction.

pub mod async_storage;
pub mod local;
pub mod manager;
pub mod metadata;
pub mod models;

pub use async_storage::AsyncFileStorage;
pub use local::LocalFileStorage;
pub use manager::{FileStorageManager, LocalStorageFactory, StorageFactory};
pub use metadata::{content_type_for, derive_metadata};
pub use models::{
    ContentKind, DownloadContent, DownloadResult, FileMetadata, UploadContent, UploadResult,
};

use crate::error::Result;

/// Byte-level persistence of named blobs.
///
/// Implementations are synchronous and blocking; use [`AsyncFileStorage`]
/// to call them from async code.
pub trait FileStorage: Send + Sync {
    fn provider_name(&self) -> &str;

    fn upload(
        &self,
        file_id: &str,
        content: UploadContent,
        metadata: Option<FileMetadata>,
    ) -> Result<UploadResult>;

    /// Fails with `NotFound` when `file_id` does not name a regular file.
    fn download(&self, file_id: &str, kind: ContentKind) -> Result<DownloadResult>;

    /// Returns `false` when there was nothing to delete.
    fn delete(&self, file_id: &str) -> Result<bool>;

    fn exists(&self, file_id: &str) -> Result<bool>;

    fn get_metadata(&self, file_id: &str) -> Result<Option<FileMetadata>>;

    /// Lists regular files under `prefix`. `max_results <= 0` means no limit.
    fn list_files(&self, prefix: &str, max_results: i64) -> Result<Vec<FileMetadata>>;

    fn copy(&self, source_id: &str, target_id: &str) -> Result<UploadResult> {
        let downloaded = self.download(source_id, ContentKind::Bytes)?;
        let metadata = downloaded.metadata.clone();
        let data = downloaded.into_bytes()?;
        self.upload(target_id, UploadContent::Bytes(data), metadata)
    }
}
