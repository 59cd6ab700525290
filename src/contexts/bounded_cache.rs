use crate::data::{BoundedCacheSnapshot, Cache};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Slot {
    value: String,
    stored_at: Instant,
    last_used: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    clock: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn purge_expired(&mut self, ttl: Option<Duration>) {
        if let Some(ttl) = ttl {
            self.slots.retain(|key, slot| {
                let live = slot.stored_at.elapsed() < ttl;
                if !live {
                    tracing::debug!("[BoundedCache] purge, expired, key={}", key);
                }
                live
            });
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.slots.remove(&key);
            tracing::debug!("[BoundedCache] evict, least recently used, key={}", key);
        }
    }
}

/// BoundedCache is a Cache with a size limit and an optional time-to-live.
///
/// - A hit refreshes the entry's recency.
/// - An entry older than the TTL is dropped on access and reported as a miss.
/// - Storing into a full cache first evicts the least recently used entry.
pub struct BoundedCache {
    state: Mutex<State>,
    max_entries: usize,
    ttl: Option<Duration>,
}

impl BoundedCache {
    /// Creates a new BoundedCache
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries held at once (at least 1)
    /// * `ttl` - How long an entry stays valid after being stored; `None` keeps entries until evicted
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Current size, bounds and keys (least recently used first)
    pub fn snapshot(&self) -> BoundedCacheSnapshot {
        let mut state = self.lock();
        state.purge_expired(self.ttl);

        let mut by_recency: Vec<(&String, u64)> = state
            .slots
            .iter()
            .map(|(key, slot)| (key, slot.last_used))
            .collect();
        by_recency.sort_by_key(|(_, last_used)| *last_used);

        BoundedCacheSnapshot {
            size: by_recency.len(),
            max_size: self.max_entries,
            ttl_secs: self.ttl.map(|ttl| ttl.as_secs()),
            keys: by_recency.into_iter().map(|(key, _)| key.clone()).collect(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, slot: &Slot) -> bool {
        self.ttl
            .map(|ttl| slot.stored_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

impl Cache for BoundedCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut state = self.lock();

        let expired = match state.slots.get(key) {
            Some(slot) => self.is_expired(slot),
            None => return None,
        };
        if expired {
            state.slots.remove(key);
            tracing::debug!("[BoundedCache] get, expired, key={}", key);
            return None;
        }

        let now = state.tick();
        state.slots.get_mut(key).map(|slot| {
            slot.last_used = now;
            slot.value.clone()
        })
    }

    fn set(&self, key: &str, value: &str) {
        let mut state = self.lock();

        if let Some(slot) = state.slots.get(key) {
            if !self.is_expired(slot) {
                return;
            }
            state.slots.remove(key);
        }

        state.purge_expired(self.ttl);
        while state.slots.len() >= self.max_entries {
            state.evict_least_recent();
        }

        let now = state.tick();
        state.slots.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                stored_at: Instant::now(),
                last_used: now,
            },
        );
    }

    fn len(&self) -> usize {
        let mut state = self.lock();
        state.purge_expired(self.ttl);
        state.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_lru_eviction() {
        let cache = BoundedCache::new(2, None);
        cache.set("a", "1");
        cache.set("b", "2");

        // Touch "a" so "b" becomes the least recently used entry
        assert_eq!(cache.get("a"), Some("1".to_string()));
        cache.set("c", "3");

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some("1".to_string()));
        assert_eq!(cache.get("c"), Some("3".to_string()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = BoundedCache::new(10, Some(Duration::from_millis(30)));
        cache.set("a", "1");
        assert_eq!(cache.get("a"), Some("1".to_string()));

        thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_can_be_replaced() {
        let cache = BoundedCache::new(10, Some(Duration::from_millis(30)));
        cache.set("a", "old");
        thread::sleep(Duration::from_millis(60));

        cache.set("a", "new");
        assert_eq!(cache.get("a"), Some("new".to_string()));
    }

    #[test]
    fn test_live_entry_is_not_overwritten() {
        let cache = BoundedCache::new(10, None);
        cache.set("a", "first");
        cache.set("a", "second");
        assert_eq!(cache.get("a"), Some("first".to_string()));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = BoundedCache::new(0, None);
        assert_eq!(cache.max_entries(), 1);

        cache.set("a", "1");
        cache.set("b", "2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_snapshot() {
        let cache = BoundedCache::new(5, Some(Duration::from_secs(300)));
        cache.set("a", "1");
        cache.set("b", "2");
        cache.get("a");

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.size, 2);
        assert_eq!(snapshot.max_size, 5);
        assert_eq!(snapshot.ttl_secs, Some(300));
        assert_eq!(snapshot.keys, vec!["b".to_string(), "a".to_string()]);
    }
}
