use crate::contexts::MemoryCache;
use crate::data::{Cache, LookupError, LookupStats, Provider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Gate = Arc<Mutex<()>>;

/// Memoizing Lookup context: a caching proxy in front of a Provider
///
/// Role players:
/// - `provider` answers misses
/// - `cache` remembers every successful answer
///
/// A key's value is fetched from the provider at most once, including under
/// concurrent first access: callers racing on the same unresolved key queue
/// behind a per-key gate and are served from the store once the first caller
/// has resolved it. Failed lookups are never stored.
pub struct MemoizingLookupCache<P, C = MemoryCache> {
    provider: P,
    cache: C,
    /// Keys currently being resolved, with the gate their waiters queue on
    in_flight: Mutex<HashMap<String, Gate>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl<P: Provider> MemoizingLookupCache<P, MemoryCache> {
    /// Creates a cache proxy over `provider`, starting with an empty in-memory store
    pub fn new(provider: P) -> Self {
        Self::with_cache(provider, MemoryCache::new())
    }
}

impl<P, C> MemoizingLookupCache<P, C>
where
    P: Provider,
    C: Cache,
{
    /// Creates a cache proxy over `provider` that stores answers in `cache`
    pub fn with_cache(provider: P, cache: C) -> Self {
        Self {
            provider,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Public function: get
    ///
    /// Returns the stored value for `key`, or asks the provider on the first
    /// request for it and stores the answer.
    pub fn get(&self, key: &str) -> Result<String, LookupError> {
        // Resolved keys are served without touching the gate table
        if let Some(value) = self.cache.get(key) {
            return Ok(self.record_hit(key, value));
        }

        let gate = self.gate_for(key);
        let _turn = lock(&gate);

        // Whoever held the gate before us may have resolved the key
        if let Some(value) = self.cache.get(key) {
            return Ok(self.record_hit(key, value));
        }

        // Dropped before `_turn`, so the gate leaves the table while still held,
        // even if the provider panics
        let _release = GateRelease {
            in_flight: &self.in_flight,
            key,
            gate: &gate,
        };
        self.resolve(key)
    }

    /// Whether a value for `key` is already stored
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Role method: provider.get, followed by cache.set on success
    fn resolve(&self, key: &str) -> Result<String, LookupError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::info!("[MemoizingLookupCache] get, miss, key={}", key);

        match self.provider.get(key) {
            Ok(value) => {
                self.cache.set(key, &value);
                Ok(value)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "[MemoizingLookupCache] get, provider failed, nothing stored, key={}, error={}",
                    key,
                    e
                );
                Err(e)
            }
        }
    }

    fn record_hit(&self, key: &str, value: String) -> String {
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[MemoizingLookupCache] get, hit, key={}", key);
        value
    }

    fn gate_for(&self, key: &str) -> Gate {
        lock(&self.in_flight)
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

/// Removes a key's gate from the in-flight table when the resolving caller is done
struct GateRelease<'a> {
    in_flight: &'a Mutex<HashMap<String, Gate>>,
    key: &'a str,
    gate: &'a Gate,
}

impl Drop for GateRelease<'_> {
    /// Drops the gate for `key` unless a later caller already replaced it
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        if in_flight
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, self.gate))
        {
            in_flight.remove(self.key);
        }
    }
}

impl<P, C> Provider for MemoizingLookupCache<P, C>
where
    P: Provider,
    C: Cache,
{
    fn get(&self, key: &str) -> Result<String, LookupError> {
        MemoizingLookupCache::get(self, key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::BoundedCache;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    /// Provider answering "data_" + key and counting calls per key
    #[derive(Default)]
    struct CountingProvider {
        calls: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
    }

    impl CountingProvider {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn calls_for(&self, key: &str) -> usize {
            self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    impl Provider for CountingProvider {
        fn get(&self, key: &str) -> Result<String, LookupError> {
            *self.calls.lock().unwrap().entry(key.to_string()).or_default() += 1;
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            Ok(format!("data_{}", key))
        }
    }

    /// Provider that fails the first `failures` calls, then succeeds
    struct FlakyProvider {
        remaining_failures: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(failures: usize) -> Self {
            Self {
                remaining_failures: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Provider for FlakyProvider {
        fn get(&self, key: &str) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.remaining_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(LookupError::failed(key, "backend unavailable"));
            }
            Ok(format!("data_{}", key))
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = MemoizingLookupCache::new(CountingProvider::default());

        assert_eq!(cache.get("user1").unwrap(), "data_user1");
        assert_eq!(cache.provider().calls_for("user1"), 1);

        assert_eq!(cache.get("user1").unwrap(), "data_user1");
        assert_eq!(cache.provider().calls_for("user1"), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_key_isolation() {
        let cache = MemoizingLookupCache::new(CountingProvider::default());

        cache.get("user1").unwrap();
        assert_eq!(cache.get("user2").unwrap(), "data_user2");

        assert_eq!(cache.cache().get("user1"), Some("data_user1".to_string()));
        assert_eq!(cache.provider().calls_for("user1"), 1);
        assert_eq!(cache.provider().calls_for("user2"), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = MemoizingLookupCache::new(FlakyProvider::new(1));

        let err = cache.get("user1").unwrap_err();
        assert!(matches!(err, LookupError::LookupFailed { .. }));
        assert!(!cache.contains("user1"));
        assert_eq!(cache.stats().failures, 1);

        // The next request goes back to the provider and succeeds
        assert_eq!(cache.get("user1").unwrap(), "data_user1");
        assert_eq!(cache.provider().calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains("user1"));
    }

    #[test]
    fn test_singleflight_on_concurrent_first_access() {
        let cache = MemoizingLookupCache::new(CountingProvider::slow(Duration::from_millis(50)));

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(cache.get("shared").unwrap(), "data_shared");
                });
            }
        });

        assert_eq!(cache.provider().calls_for("shared"), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[test]
    fn test_distinct_keys_resolve_independently() {
        let cache = MemoizingLookupCache::new(CountingProvider::slow(Duration::from_millis(10)));

        thread::scope(|scope| {
            for i in 0..4 {
                let cache = &cache;
                scope.spawn(move || {
                    let key = format!("user{}", i);
                    assert_eq!(cache.get(&key).unwrap(), format!("data_{}", key));
                });
            }
        });

        assert_eq!(cache.provider().total_calls(), 4);
        assert!(lock(&cache.in_flight).is_empty());
    }

    /// Provider that panics for one key
    struct Explosive;

    impl Provider for Explosive {
        fn get(&self, key: &str) -> Result<String, LookupError> {
            if key == "boom" {
                panic!("backend crashed on {}", key);
            }
            Ok(format!("data_{}", key))
        }
    }

    #[test]
    fn test_provider_panic_releases_gate() {
        let cache = MemoizingLookupCache::new(Explosive);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cache.get("boom")));
        assert!(outcome.is_err());
        assert!(lock(&cache.in_flight).is_empty());
        assert!(!cache.contains("boom"));

        // The cache keeps working after the panic
        assert_eq!(cache.get("user1").unwrap(), "data_user1");
        assert!(lock(&cache.in_flight).is_empty());
    }

    #[test]
    fn test_with_bounded_store_refetches_evicted_keys() {
        let cache =
            MemoizingLookupCache::with_cache(CountingProvider::default(), BoundedCache::new(1, None));

        cache.get("a").unwrap();
        cache.get("b").unwrap();
        cache.get("a").unwrap();

        assert_eq!(cache.provider().calls_for("a"), 2);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_is_itself_a_provider() {
        fn fetch_twice(provider: &impl Provider) -> (String, String) {
            (provider.get("k").unwrap(), provider.get("k").unwrap())
        }

        let cache = MemoizingLookupCache::new(CountingProvider::default());
        let (first, second) = fetch_twice(&cache);

        assert_eq!(first, second);
        assert_eq!(cache.provider().calls_for("k"), 1);
    }
}
