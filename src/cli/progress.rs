use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Instant;

use surrogate::data::{LookupError, LookupStats};

/// Collects the outcome of each looked-up key and prints the run summary
pub struct ProgressIndicator {
    total: usize,
    values: BTreeMap<String, String>,
    errors: BTreeMap<String, String>,
    /// Print each key as it completes
    echo: bool,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(total: usize, echo: bool) -> Self {
        Self {
            total,
            values: BTreeMap::new(),
            errors: BTreeMap::new(),
            echo,
            start_time: Instant::now(),
        }
    }

    /// Records the outcome for `key`; a repeated key keeps its latest outcome
    pub fn complete_item(&mut self, key: &str, outcome: Result<String, LookupError>) {
        match outcome {
            Ok(value) => {
                if self.echo {
                    println!("{} = {}", key, value);
                }
                self.errors.remove(key);
                self.values.insert(key.to_string(), value);
            }
            Err(e) => {
                if self.echo {
                    eprintln!("{}: {}", key, e);
                }
                self.values.remove(key);
                self.errors.insert(key.to_string(), e.to_string());
            }
        }
    }

    /// Distinct keys whose latest lookup failed
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn to_json(&self, stats: &LookupStats) -> Value {
        json!({
            "values": self.values,
            "errors": self.errors,
            "stats": stats,
        })
    }

    pub fn finish(&self, stats: &LookupStats) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Requested: {}", self.total);
        println!("  Succeeded: {}", self.values.len());
        println!("  Failed:    {}", self.errors.len());
        println!("  Hits:      {}", stats.hits);
        println!("  Misses:    {}", stats.misses);
        println!("  Stored:    {}", stats.entries);
        println!("  Duration:  {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_values_and_errors_per_key() {
        let mut progress = ProgressIndicator::new(3, false);
        progress.complete_item("user1", Ok("data_user1".to_string()));
        progress.complete_item("user1", Ok("data_user1".to_string()));
        progress.complete_item("ghost", Err(LookupError::failed("ghost", "no entry")));

        assert_eq!(progress.failed(), 1);

        let report = progress.to_json(&LookupStats {
            hits: 1,
            misses: 2,
            failures: 1,
            entries: 1,
        });
        assert_eq!(report["values"]["user1"], "data_user1");
        assert_eq!(
            report["errors"]["ghost"],
            "Lookup for key 'ghost' failed: no entry"
        );
        assert_eq!(report["stats"]["hits"], 1);
    }

    #[test]
    fn test_later_success_clears_earlier_failure() {
        let mut progress = ProgressIndicator::new(2, false);
        progress.complete_item("k", Err(LookupError::failed("k", "flaky")));
        progress.complete_item("k", Ok("v".to_string()));

        assert_eq!(progress.failed(), 0);
    }
}
