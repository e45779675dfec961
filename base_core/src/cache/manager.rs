use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::memory::{CacheStats, MemoryCache};
use super::Cache;
use crate::config::CacheConfig;
use crate::error::{BaseError, Result};

const SUPPORTED_PROVIDERS: &[&str] = &["memory", "caffeine"];

/// Hands out named caches built with the configured provider.
#[derive(Clone)]
pub struct CacheManager {
    config: CacheConfig,
    caches: Arc<RwLock<HashMap<String, Arc<dyn Cache>>>>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Result<Self> {
        let provider = config.provider.to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(BaseError::InvalidArgument(format!(
                "Unsupported cache provider: {} (supported: {:?})",
                config.provider, SUPPORTED_PROVIDERS
            )));
        }

        info!(
            "Cache manager using '{}' provider (max_size={}, ttl={}s)",
            provider, config.max_size, config.default_ttl_seconds
        );

        Ok(Self {
            config,
            caches: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    pub fn get_cache(&self, name: &str) -> Arc<dyn Cache> {
        if let Some(cache) = self.caches.read().get(name) {
            return Arc::clone(cache);
        }

        let mut caches = self.caches.write();
        let cache = caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::new(name, &self.config)) as Arc<dyn Cache>);
        Arc::clone(cache)
    }

    pub fn has_cache(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    pub fn remove_cache(&self, name: &str) -> bool {
        self.caches.write().remove(name).is_some()
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Empties every cache but keeps them registered.
    pub fn clear_all(&self) {
        for cache in self.caches.read().values() {
            cache.clear();
        }
    }

    pub fn stats(&self) -> HashMap<String, CacheStats> {
        self.caches
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), cache.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheExt;

    #[test]
    fn test_provider_selection() {
        assert!(CacheManager::new(CacheConfig::default()).is_ok());

        let caffeine = CacheConfig {
            provider: "Caffeine".to_string(),
            ..CacheConfig::default()
        };
        assert!(CacheManager::new(caffeine).is_ok());

        let redis = CacheConfig {
            provider: "redis".to_string(),
            ..CacheConfig::default()
        };
        assert!(matches!(
            CacheManager::new(redis),
            Err(BaseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_named_caches_are_shared() {
        let manager = CacheManager::new(CacheConfig::default()).unwrap();

        manager.get_cache("metadata").put_as("a", &1).unwrap();
        let value: Option<i32> = manager.get_cache("metadata").get_as("a");
        assert_eq!(value, Some(1));

        let other: Option<i32> = manager.get_cache("tokens").get_as("a");
        assert_eq!(other, None);

        assert_eq!(manager.cache_names(), vec!["metadata".to_string(), "tokens".to_string()]);
        assert_eq!(manager.get_cache("metadata").name(), "metadata");
    }

    #[test]
    fn test_clear_and_remove() {
        let manager = CacheManager::new(CacheConfig::default()).unwrap();
        manager.get_cache("a").put("k", serde_json::json!(1));
        manager.get_cache("b").put("k", serde_json::json!(2));

        manager.clear_all();
        assert!(manager.get_cache("a").is_empty());
        assert!(manager.has_cache("b"));

        assert!(manager.remove_cache("b"));
        assert!(!manager.has_cache("b"));
        assert_eq!(manager.stats().len(), 1);
    }
}
