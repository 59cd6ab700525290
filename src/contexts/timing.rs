use crate::contexts::interception::{Call, Interceptor};
use crate::data::LookupError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Reports how long each delegated call took
#[derive(Debug, Default)]
pub struct TimingInterceptor {
    calls: AtomicU64,
    total_micros: AtomicU64,
}

impl TimingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observed_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn total_elapsed(&self) -> Duration {
        Duration::from_micros(self.total_micros.load(Ordering::Relaxed))
    }
}

impl Interceptor for TimingInterceptor {
    fn before_call(&self, call: &Call<'_>) -> Result<(), LookupError> {
        tracing::debug!(
            "[TimingInterceptor] before_call, operation={}, key={}",
            call.operation,
            call.key
        );
        Ok(())
    }

    fn after_call(&self, call: &Call<'_>, outcome: &Result<String, LookupError>) {
        let elapsed = call.elapsed();
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        tracing::info!(
            "[TimingInterceptor] after_call, operation={}, key={}, ok={}, elapsed_ms={:.3}",
            call.operation,
            call.key,
            outcome.is_ok(),
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::Intercepted;
    use crate::data::Provider;
    use std::sync::Arc;
    use std::thread;

    struct Slow;

    impl Provider for Slow {
        fn get(&self, key: &str) -> Result<String, LookupError> {
            thread::sleep(Duration::from_millis(20));
            Ok(key.to_string())
        }
    }

    #[test]
    fn test_measures_delegated_calls() {
        let timing = Arc::new(TimingInterceptor::new());
        let proxy = Intercepted::new(Slow).with(timing.clone());

        proxy.get("a").unwrap();
        proxy.get("b").unwrap();

        assert_eq!(timing.observed_calls(), 2);
        assert!(timing.total_elapsed() >= Duration::from_millis(40));
    }
}
