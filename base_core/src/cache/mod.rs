//! Named caches behind a provider abstraction.

pub mod manager;
pub mod memory;

pub use manager::CacheManager;
pub use memory::{CacheEntry, CacheStats, MemoryCache};

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::warn;

pub trait Cache: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Stores `value` with the cache's default time-to-live.
    fn put(&self, key: &str, value: serde_json::Value);

    /// `None` keeps the entry until it is evicted.
    fn put_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>);

    fn evict(&self, key: &str) -> bool;

    fn clear(&self);

    fn contains(&self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

/// Typed access on top of the JSON values a [`Cache`] stores.
pub trait CacheExt: Cache {
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to deserialize cached value for key {}: {}", key, e);
                self.evict(key);
                None
            }
        }
    }

    fn put_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        self.put(key, serde_json::to_value(value)?);
        Ok(())
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

pub fn generate_key(prefix: &str, components: &[&str]) -> String {
    let mut key = prefix.to_string();
    for component in components {
        key.push(':');
        key.push_str(component);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        assert_eq!(generate_key("files", &["local", "a.txt"]), "files:local:a.txt");
        assert_eq!(generate_key("bare", &[]), "bare");
    }
}
