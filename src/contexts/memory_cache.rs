use crate::data::Cache;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// MemoryCache is an unbounded, in-process implementation of the Cache trait.
///
/// Entries are written once: `set` on a key that is already present keeps the
/// stored value. Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    // A poisoned lock only means another caller panicked mid-call; the map
    // itself is never left half-written, so keep serving it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.write();
        if entries.contains_key(key) {
            tracing::debug!("[MemoryCache] set, key already stored, key={}", key);
            return;
        }
        entries.insert(key.to_string(), value.to_string());
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_get_set() {
        let cache = MemoryCache::new();

        assert_eq!(cache.get("nonexistent"), None);
        assert!(cache.is_empty());

        cache.set("test_key", "test_value");
        assert_eq!(cache.get("test_key"), Some("test_value".to_string()));
        assert!(cache.contains("test_key"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_first_writer_wins() {
        let cache = MemoryCache::new();
        cache.set("test_key", "first");
        cache.set("test_key", "second");

        assert_eq!(cache.get("test_key"), Some("first".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys() {
        let cache = MemoryCache::new();
        cache.set("a", "1");
        cache.set("b", "2");

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
