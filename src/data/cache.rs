use std::sync::Arc;

/// Cache trait for storing and retrieving string values by key.
///
/// Implementations take `&self` for both reads and writes so a store can be
/// shared between callers; interior mutability is the implementation's job.
/// Implementations should handle errors gracefully without panicking.
pub trait Cache {
    /// Retrieves a cached value for the given key.
    ///
    /// # Arguments
    /// * `key` - The cache key to look up
    ///
    /// # Returns
    /// * `Some(String)` - The cached value if found
    /// * `None` - If the key doesn't exist or retrieval fails
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value in the cache for the given key.
    ///
    /// # Arguments
    /// * `key` - The cache key to store under
    /// * `value` - The value to cache
    ///
    /// # Notes
    /// Errors during storage should be handled gracefully (logged but not panicked).
    /// This method does not return errors to maintain fire-and-forget semantics.
    fn set(&self, key: &str, value: &str);

    /// Number of entries currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<C: Cache + ?Sized> Cache for Box<C> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }
}
