use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod demo;
mod progress;

use progress::ProgressIndicator;
use surrogate::contexts::{BoundedCache, FileCache, MemoizingLookupCache, MemoryCache};
use surrogate::data::LookupError;
use surrogate::registries::{PrefixProvider, YamlTableProvider};

pub use demo::demo;

pub type DynProvider = Box<dyn surrogate::data::Provider + Send + Sync>;
pub type DynCache = Box<dyn surrogate::data::Cache + Send + Sync>;

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub verbose: bool,
    pub json: bool,
    pub cache_dir: Option<PathBuf>,
    pub table: Option<PathBuf>,
    pub max_entries: Option<usize>,
    pub ttl_secs: Option<u64>,
    pub latency_ms: u64,
}

impl Config {
    fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    fn is_bounded(&self) -> bool {
        self.max_entries.is_some() || self.ttl_secs.is_some()
    }
}

/// Looks up every key through the caching proxy and prints the answers
pub async fn get(keys: Vec<String>, parallel: bool, config: &Config) -> Result<()> {
    if keys.is_empty() {
        println!("No keys given to look up");
        return Ok(());
    }

    let provider = build_provider(config);
    let store = build_store(config)?;
    let lookup = Arc::new(MemoizingLookupCache::with_cache(provider, store));

    if config.verbose {
        println!(
            "Looking up {} key(s){}",
            keys.len(),
            if parallel { " in parallel" } else { "" }
        );
    }

    let outcomes = if parallel {
        lookup_parallel(&lookup, &keys).await?
    } else {
        keys.iter().map(|key| lookup.get(key)).collect()
    };

    let mut progress = ProgressIndicator::new(keys.len(), !config.json);
    for (key, outcome) in keys.iter().zip(outcomes) {
        progress.complete_item(key, outcome);
    }

    let stats = lookup.stats();
    if config.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&progress.to_json(&stats))
                .context("Failed to serialize lookup report")?
        );
    } else {
        progress.finish(&stats);
    }

    if progress.failed() > 0 {
        bail!("{} lookup(s) failed", progress.failed());
    }
    Ok(())
}

async fn lookup_parallel(
    lookup: &Arc<MemoizingLookupCache<DynProvider, DynCache>>,
    keys: &[String],
) -> Result<Vec<Result<String, LookupError>>> {
    let handles: Vec<_> = keys
        .iter()
        .cloned()
        .map(|key| {
            let lookup = Arc::clone(lookup);
            tokio::task::spawn_blocking(move || lookup.get(&key))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.context("Lookup task panicked")?);
    }
    Ok(outcomes)
}

/// Picks the real provider: a YAML table when one is configured, otherwise the prefix backend
pub fn build_provider(config: &Config) -> DynProvider {
    match &config.table {
        Some(path) => Box::new(YamlTableProvider::new(path.clone())),
        None => Box::new(PrefixProvider::default().with_latency(config.latency())),
    }
}

/// Picks the store backing the cache proxy
pub fn build_store(config: &Config) -> Result<DynCache> {
    if let Some(dir) = &config.cache_dir {
        if config.is_bounded() {
            bail!("--cache-dir cannot be combined with --max-entries or --ttl-secs");
        }
        let folder = dir
            .to_str()
            .with_context(|| format!("Cache directory is not valid UTF-8: {}", dir.display()))?
            .to_string();
        return Ok(Box::new(FileCache::new(Some(folder), provider_namespace(config))));
    }

    if config.is_bounded() {
        let max_entries = config.max_entries.unwrap_or(usize::MAX);
        return Ok(Box::new(BoundedCache::new(max_entries, config.ttl())));
    }

    Ok(Box::new(MemoryCache::new()))
}

/// Generates a hash identifying the configured provider
///
/// Used as the FileCache subfolder so answers from different providers never mix.
fn provider_namespace(config: &Config) -> String {
    let identity = match &config.table {
        Some(path) => {
            let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
            format!("table:{}", resolved.display())
        }
        None => format!("prefix:{}", PrefixProvider::default().prefix()),
    };
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parses `user=grant,grant` pairs into an access-control grant table
pub fn parse_grants(entries: &[&str]) -> Result<HashMap<String, Vec<String>>> {
    let mut grants = HashMap::new();
    for entry in entries {
        let (user, patterns) = entry
            .split_once('=')
            .with_context(|| format!("Invalid grant '{}', expected user=pattern[,pattern]", entry))?;
        let patterns = patterns
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        grants.insert(user.trim().to_string(), patterns);
    }
    Ok(grants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrogate::data::Cache;

    #[test]
    fn test_default_store_is_memory() {
        let store = build_store(&Config::default()).unwrap();
        store.set("a", "1");
        store.set("a", "2");
        assert_eq!(store.get("a"), Some("1".to_string()));
    }

    #[test]
    fn test_bounded_store() {
        let config = Config {
            max_entries: Some(1),
            ..Config::default()
        };
        let store = build_store(&config).unwrap();
        store.set("a", "1");
        store.set("b", "2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_rejects_bounds() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/surrogate")),
            ttl_secs: Some(5),
            ..Config::default()
        };
        assert!(build_store(&config).is_err());
    }

    #[test]
    fn test_namespace_depends_on_provider() {
        let prefix = provider_namespace(&Config::default());
        let table = provider_namespace(&Config {
            table: Some(PathBuf::from("table.yml")),
            ..Config::default()
        });
        assert_ne!(prefix, table);
        assert_eq!(prefix.len(), 64);
    }

    #[test]
    fn test_parse_grants() {
        let grants = parse_grants(&["admin=all", "user=user*, product1"]).unwrap();
        assert_eq!(grants["admin"], vec!["all".to_string()]);
        assert_eq!(
            grants["user"],
            vec!["user*".to_string(), "product1".to_string()]
        );
        assert!(parse_grants(&["nobody"]).is_err());
    }
}
