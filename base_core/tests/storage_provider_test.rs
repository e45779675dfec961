use base_core::storage::{
    AsyncFileStorage, ContentKind, DownloadContent, DownloadResult, FileMetadata, FileStorage,
    FileStorageManager, UploadContent, UploadResult,
};
use base_core::{config::StorageConfig, BaseError, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Provider keeping everything in a map, used to check that the manager and
/// the async facade work with any `FileStorage`.
#[derive(Default)]
struct InMemoryStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    fn metadata_for(file_id: &str, data: &[u8]) -> Result<FileMetadata> {
        let now = Utc::now();
        FileMetadata::new(
            file_id,
            base_core::storage::content_type_for(file_id),
            data.len() as i64,
            now,
            now,
        )
    }
}

impl FileStorage for InMemoryStorage {
    fn provider_name(&self) -> &str {
        "memory"
    }

    fn upload(
        &self,
        file_id: &str,
        content: UploadContent,
        _metadata: Option<FileMetadata>,
    ) -> Result<UploadResult> {
        let data = match content {
            UploadContent::Bytes(data) => data,
            UploadContent::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                data
            }
            UploadContent::File(path) => std::fs::read(path)?,
        };
        let metadata = Self::metadata_for(file_id, &data)?;
        self.files.write().insert(file_id.to_string(), data);
        Ok(UploadResult::success(file_id, PathBuf::from(file_id), metadata))
    }

    fn download(&self, file_id: &str, _kind: ContentKind) -> Result<DownloadResult> {
        let data = self
            .files
            .read()
            .get(file_id)
            .cloned()
            .ok_or_else(|| BaseError::NotFound(format!("File not found: {}", file_id)))?;
        let metadata = Self::metadata_for(file_id, &data)?;
        Ok(DownloadResult::success(file_id, DownloadContent::Bytes(data), metadata))
    }

    fn delete(&self, file_id: &str) -> Result<bool> {
        Ok(self.files.write().remove(file_id).is_some())
    }

    fn exists(&self, file_id: &str) -> Result<bool> {
        Ok(self.files.read().contains_key(file_id))
    }

    fn get_metadata(&self, file_id: &str) -> Result<Option<FileMetadata>> {
        self.files
            .read()
            .get(file_id)
            .map(|data| Self::metadata_for(file_id, data))
            .transpose()
    }

    fn list_files(&self, prefix: &str, max_results: i64) -> Result<Vec<FileMetadata>> {
        let limit = if max_results <= 0 { usize::MAX } else { max_results as usize };
        self.files
            .read()
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .take(limit)
            .map(|(id, data)| Self::metadata_for(id, data))
            .collect()
    }
}

fn manager_in(dir: &TempDir) -> FileStorageManager {
    let config = StorageConfig {
        base_path: dir.path().join("files"),
        ..StorageConfig::default()
    };
    FileStorageManager::from_config(&config)
}

#[test]
fn test_custom_provider_through_factory() {
    let dir = TempDir::new().unwrap();
    let manager = manager_in(&dir).with_factory("memory", || -> Result<Arc<dyn FileStorage>> {
        Ok(Arc::new(InMemoryStorage::default()))
    });

    let storage = manager.get_storage("memory").unwrap();
    assert_eq!(storage.provider_name(), "memory");
    assert!(Arc::ptr_eq(&storage, &manager.get_storage("memory").unwrap()));

    storage
        .upload("notes.txt", UploadContent::from(b"# hi".as_slice()), None)
        .unwrap();
    let metadata = storage.get_metadata("notes.txt").unwrap().unwrap();
    assert_eq!(metadata.content_type(), "text/plain");
    assert_eq!(metadata.size_bytes(), 4);

    assert_eq!(manager.provider_names(), vec!["memory".to_string()]);
    assert!(matches!(
        manager.get_storage("s3"),
        Err(BaseError::InvalidArgument(_))
    ));
}

#[test]
fn test_copy_between_ids_uses_default_implementation() {
    let storage = InMemoryStorage::default();
    storage
        .upload("a.txt", UploadContent::Bytes(b"abc".to_vec()), None)
        .unwrap();

    let result = storage.copy("a.txt", "b.txt").unwrap();
    assert!(result.is_success());
    assert_eq!(
        storage.download("b.txt", ContentKind::Bytes).unwrap().into_bytes().unwrap(),
        b"abc"
    );
    assert!(matches!(storage.copy("zzz", "y"), Err(BaseError::NotFound(_))));
}

#[tokio::test]
async fn test_async_facade_over_local_provider() {
    let dir = TempDir::new().unwrap();
    let manager = manager_in(&dir);
    let storage = AsyncFileStorage::new(manager.get_default_storage().unwrap());
    assert_eq!(storage.provider_name(), "local");

    for i in 0..5 {
        storage
            .upload(format!("logs/{}.log", i), UploadContent::Bytes(vec![b'x'; i]), None)
            .await
            .unwrap();
    }

    let listed = storage.list_files("logs", 2).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].file_name(), "logs/0.log");
    assert!(listed[0].is_empty());

    let all = storage.list_files("", 0).await.unwrap();
    assert_eq!(all.len(), 5);

    assert!(storage.delete("logs/0.log").await.unwrap());
    assert!(!storage.delete("logs/0.log").await.unwrap());
    assert!(!storage.exists("logs").await.unwrap());
    assert!(storage.get_metadata("logs/0.log").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_first_access_creates_one_instance() {
    let dir = TempDir::new().unwrap();
    let manager = manager_in(&dir);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::task::spawn_blocking(move || manager.get_default_storage().unwrap())
        })
        .collect();

    let mut storages = Vec::new();
    for handle in handles {
        storages.push(handle.await.unwrap());
    }

    assert_eq!(manager.storage_count(), 1);
    assert!(storages.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}
