use crate::data::{LookupError, Provider};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single intercepted request, as seen by the hooks
///
/// Hooks can leave per-call attributes in `before_call` and read them back in
/// `after_call`; they live exactly as long as the call.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    /// Name of the intercepted operation
    pub operation: &'static str,
    pub key: &'a str,
    pub started_at: Instant,
    attributes: RefCell<HashMap<&'static str, String>>,
}

impl<'a> Call<'a> {
    pub fn new(operation: &'static str, key: &'a str) -> Self {
        Self {
            operation,
            key,
            started_at: Instant::now(),
            attributes: RefCell::new(HashMap::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Attaches `value` to this call under `name`, replacing any earlier value
    pub fn set_attribute(&self, name: &'static str, value: impl Into<String>) {
        self.attributes.borrow_mut().insert(name, value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }
}

/// Hooks run around a delegated lookup
pub trait Interceptor: Send + Sync {
    /// Runs before the call is delegated. Returning an error rejects the call:
    /// the wrapped provider is not invoked and the error is returned instead.
    fn before_call(&self, _call: &Call<'_>) -> Result<(), LookupError> {
        Ok(())
    }

    /// Runs after the call with its outcome, including rejections
    fn after_call(&self, _call: &Call<'_>, _outcome: &Result<String, LookupError>) {}
}

/// Intercepted wraps a Provider and passes every call through a chain of
/// interceptors. It is a Provider itself.
///
/// `before_call` hooks run in registration order, `after_call` hooks in
/// reverse order, and only for interceptors whose `before_call` ran.
pub struct Intercepted<P> {
    inner: P,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl<P: Provider> Intercepted<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            interceptors: Vec::new(),
        }
    }

    /// Adds an interceptor to the end of the chain
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Role method: proxy.invoke
    fn invoke(&self, call: &Call<'_>) -> Result<String, LookupError> {
        let mut entered = 0;
        let mut outcome = None;

        for interceptor in &self.interceptors {
            entered += 1;
            if let Err(rejection) = interceptor.before_call(call) {
                tracing::debug!(
                    "[Intercepted] invoke, rejected before delegation, key={}, error={}",
                    call.key,
                    rejection
                );
                outcome = Some(Err(rejection));
                break;
            }
        }

        let outcome = outcome.unwrap_or_else(|| self.inner.get(call.key));

        for interceptor in self.interceptors[..entered].iter().rev() {
            interceptor.after_call(call, &outcome);
        }

        outcome
    }
}

impl<P: Provider> Provider for Intercepted<P> {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        self.invoke(&Call::new("get", key))
    }
}
