use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::local::{LocalFileStorage, LOCAL_PROVIDER};
use super::FileStorage;
use crate::config::StorageConfig;
use crate::error::{BaseError, Result};

/// Builds a storage instance for one provider name.
pub trait StorageFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn FileStorage>>;
}

impl<F> StorageFactory for F
where
    F: Fn() -> Result<Arc<dyn FileStorage>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn FileStorage>> {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorageFactory {
    config: StorageConfig,
}

impl LocalStorageFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

impl StorageFactory for LocalStorageFactory {
    fn create(&self) -> Result<Arc<dyn FileStorage>> {
        Ok(Arc::new(LocalFileStorage::from_config(&self.config)?))
    }
}

/// Directory of storage providers keyed by name.
///
/// Instances are built on first request through the factory registered for
/// that name and kept until removed or cleared.
#[derive(Clone)]
pub struct FileStorageManager {
    default_provider: String,
    factories: Arc<RwLock<HashMap<String, Arc<dyn StorageFactory>>>>,
    storages: Arc<RwLock<HashMap<String, Arc<dyn FileStorage>>>>,
}

impl FileStorageManager {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            default_provider: default_provider.into(),
            factories: Arc::new(RwLock::new(HashMap::new())),
            storages: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Manager whose only factory is the local provider built from `config`.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.provider.clone())
            .with_factory(LOCAL_PROVIDER, LocalStorageFactory::new(config.clone()))
    }

    pub fn with_factory(self, name: impl Into<String>, factory: impl StorageFactory + 'static) -> Self {
        self.register_factory(name, factory);
        self
    }

    pub fn register_factory(&self, name: impl Into<String>, factory: impl StorageFactory + 'static) {
        self.factories.write().insert(name.into(), Arc::new(factory));
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn get_storage(&self, provider_name: &str) -> Result<Arc<dyn FileStorage>> {
        if let Some(storage) = self.storages.read().get(provider_name) {
            return Ok(Arc::clone(storage));
        }

        let factory = self
            .factories
            .read()
            .get(provider_name)
            .cloned()
            .ok_or_else(|| {
                BaseError::InvalidArgument(format!("Unsupported storage provider: {}", provider_name))
            })?;

        let mut storages = self.storages.write();
        if let Some(storage) = storages.get(provider_name) {
            return Ok(Arc::clone(storage));
        }

        let storage = factory.create()?;
        info!("Created file storage for provider '{}'", provider_name);
        storages.insert(provider_name.to_string(), Arc::clone(&storage));
        Ok(storage)
    }

    pub fn get_default_storage(&self) -> Result<Arc<dyn FileStorage>> {
        self.get_storage(&self.default_provider)
    }

    /// Registers a ready-made instance, replacing any existing entry.
    pub fn add_storage(&self, provider_name: impl Into<String>, storage: Arc<dyn FileStorage>) {
        let provider_name = provider_name.into();
        debug!("Adding file storage '{}'", provider_name);
        self.storages.write().insert(provider_name, storage);
    }

    pub fn remove_storage(&self, provider_name: &str) -> Option<Arc<dyn FileStorage>> {
        debug!("Removing file storage '{}'", provider_name);
        self.storages.write().remove(provider_name)
    }

    pub fn clear_storage(&self) {
        self.storages.write().clear();
    }

    pub fn has_storage(&self, provider_name: &str) -> bool {
        self.storages.read().contains_key(provider_name)
    }

    pub fn storage_count(&self) -> usize {
        self.storages.read().len()
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storages.read().keys().cloned().collect();
        names.sort();
        names
    }
}
