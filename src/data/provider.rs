use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a lookup
///
/// None of these are ever cached: a failed lookup leaves no trace in the
/// store and the next request for the same key tries again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Lookup for key '{key}' failed: {reason}")]
    LookupFailed { key: String, reason: String },

    #[error("Lookup for key '{key}' rejected: no user is logged in")]
    NotAuthenticated { key: String },

    #[error("User '{user}' is not allowed to look up key '{key}'")]
    AccessDenied { user: String, key: String },
}

impl LookupError {
    pub fn failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        LookupError::LookupFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The key of the request that produced this error
    pub fn key(&self) -> &str {
        match self {
            LookupError::LookupFailed { key, .. }
            | LookupError::NotAuthenticated { key }
            | LookupError::AccessDenied { key, .. } => key,
        }
    }
}

/// A (conceptually expensive) source of values, addressed by key.
///
/// Every proxy in this crate implements `Provider` as well, so proxies can be
/// stacked in any order around the real provider.
pub trait Provider {
    /// Produce the value for `key`
    fn get(&self, key: &str) -> Result<String, LookupError>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        (**self).get(key)
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        (**self).get(key)
    }
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        (**self).get(key)
    }
}
