use crate::data::{LookupError, Provider};
use std::thread;
use std::time::Duration;

const DEFAULT_PREFIX: &str = "data_";

/// Deterministic Provider that answers `prefix + key`
///
/// An optional latency makes every call block, standing in for a slow
/// database round trip.
#[derive(Clone, Debug)]
pub struct PrefixProvider {
    prefix: String,
    latency: Option<Duration>,
}

impl PrefixProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency).filter(|latency| !latency.is_zero());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl Provider for PrefixProvider {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        tracing::info!("[PrefixProvider] get, fetching from backend, key={}", key);
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        Ok(format!("{}{}", self.prefix, key))
    }
}
