use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::Cache;
use crate::config::CacheConfig;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        let expires_at = ttl.map(|duration| {
            now + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::seconds(300))
        });

        Self {
            data,
            expires_at,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub current_size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
    pub total_requests: u64,
}

impl CacheStats {
    pub fn new(max_size: usize) -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            current_size: 0,
            max_size,
            hit_rate: 0.0,
            total_requests: 0,
        }
    }

    fn record_hit(&mut self) {
        self.hits += 1;
        self.total_requests += 1;
        self.update_hit_rate();
    }

    fn record_miss(&mut self) {
        self.misses += 1;
        self.total_requests += 1;
        self.update_hit_rate();
    }

    fn update_hit_rate(&mut self) {
        if self.total_requests > 0 {
            self.hit_rate = self.hits as f64 / self.total_requests as f64;
        }
    }
}

/// In-process LRU cache with per-entry expiry.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    name: String,
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
    stats: Arc<RwLock<CacheStats>>,
    last_cleanup: Arc<RwLock<Instant>>,
    default_ttl: Option<Duration>,
    record_stats: bool,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        let default_ttl = match config.default_ttl_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        };

        Self {
            name: name.into(),
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            stats: Arc::new(RwLock::new(CacheStats::new(capacity.get()))),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
            default_ttl,
            record_stats: config.record_stats,
        }
    }

    fn with_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        if self.record_stats {
            f(&mut *self.stats.write());
        }
    }

    fn cleanup_expired_if_needed(&self) {
        const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

        let now = Instant::now();
        let mut last_cleanup = self.last_cleanup.write();

        if now.duration_since(*last_cleanup) > CLEANUP_INTERVAL {
            *last_cleanup = now;
            drop(last_cleanup);
            self.cleanup_expired();
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        debug!("Cache '{}': removed {} expired entries", self.name, expired.len());
        expired.len()
    }
}

impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.cleanup_expired_if_needed();

        let mut entries = self.entries.write();
        let value = match entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(key);
                debug!("Cache '{}': entry expired for key {}", self.name, key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        };
        drop(entries);

        match value {
            Some(value) => {
                self.with_stats(CacheStats::record_hit);
                Some(value)
            }
            None => {
                self.with_stats(CacheStats::record_miss);
                None
            }
        }
    }

    fn put(&self, key: &str, value: serde_json::Value) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    fn put_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl);
        let displaced = self.entries.write().push(key.to_string(), entry);

        if let Some((displaced_key, _)) = displaced {
            if displaced_key != key {
                debug!("Cache '{}': evicted {}", self.name, displaced_key);
                self.with_stats(|stats| stats.evictions += 1);
            }
        }
    }

    fn evict(&self, key: &str) -> bool {
        self.entries.write().pop(key).is_some()
    }

    fn clear(&self) {
        self.entries.write().clear();
        debug!("Cache '{}': cleared", self.name);
    }

    fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .peek(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn stats(&self) -> CacheStats {
        let mut stats = if self.record_stats {
            self.stats.read().clone()
        } else {
            CacheStats::new(self.entries.read().cap().get())
        };
        stats.current_size = self.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheExt;
    use std::thread;

    fn cache_with(max_size: usize, ttl_seconds: u64) -> MemoryCache {
        MemoryCache::new(
            "test",
            &CacheConfig {
                max_size,
                default_ttl_seconds: ttl_seconds,
                ..CacheConfig::default()
            },
        )
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = cache_with(100, 3600);

        cache.put_as("test_key", &"test_value").unwrap();
        let value: Option<String> = cache.get_as("test_key");
        assert_eq!(value, Some("test_value".to_string()));

        let missing: Option<String> = cache.get_as("missing_key");
        assert_eq!(missing, None);

        assert!(cache.contains("test_key"));
        assert!(cache.evict("test_key"));
        assert!(!cache.evict("test_key"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_ttl() {
        let cache = cache_with(100, 3600);

        cache.put_with_ttl("ttl_key", serde_json::json!("ttl_value"), Some(Duration::from_millis(50)));
        assert_eq!(cache.get("ttl_key"), Some(serde_json::json!("ttl_value")));

        thread::sleep(Duration::from_millis(120));

        assert!(!cache.contains("ttl_key"));
        assert_eq!(cache.get("ttl_key"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        let cache = cache_with(10, 0);
        cache.put("forever", serde_json::json!(1));

        let entry = cache.entries.read().peek("forever").cloned().unwrap();
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = cache_with(2, 3600);

        cache.put("a", serde_json::json!(1));
        cache.put("b", serde_json::json!(2));
        cache.get("a");
        cache.put("c", serde_json::json!(3));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.stats().evictions, 1);

        cache.put("c", serde_json::json!(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_cache_stats() {
        let cache = cache_with(100, 3600);

        cache.put("key1", serde_json::json!("value1"));
        cache.put("key2", serde_json::json!("value2"));

        cache.get("key1");
        cache.get("key1");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.current_size, 2);
        assert!((stats.hit_rate - 0.6666666666666666).abs() < 0.0001);
    }

    #[test]
    fn test_stats_disabled() {
        let cache = MemoryCache::new(
            "quiet",
            &CacheConfig {
                record_stats: false,
                ..CacheConfig::default()
            },
        );
        cache.put("k", serde_json::json!(true));
        cache.get("k");

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.current_size, 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = cache_with(10, 3600);
        cache.put_with_ttl("short", serde_json::json!(1), Some(Duration::from_millis(10)));
        cache.put("long", serde_json::json!(2));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
