use serde::{Deserialize, Serialize};

/// Counters reported by a memoizing cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    /// Requests answered from the store
    pub hits: u64,
    /// Requests that went through to the provider
    pub misses: u64,
    /// Misses whose provider call failed
    pub failures: u64,
    /// Entries currently stored
    pub entries: usize,
}

impl LookupStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Point-in-time view of a bounded store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedCacheSnapshot {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: Option<u64>,
    /// Keys from least to most recently used
    pub keys: Vec<String>,
}
