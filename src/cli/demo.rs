use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::{Config, parse_grants};
use surrogate::contexts::{
    AccessControl, BoundedCache, Intercepted, MemoizingLookupCache, TimingInterceptor,
};
use surrogate::data::Provider;
use surrogate::registries::PrefixProvider;

const DEMO_LATENCY_MS: u64 = 200;
const DEMO_MAX_ENTRIES: usize = 5;
const DEMO_TTL_SECS: u64 = 10;

/// Walks through the proxies: caching, timing interception and access control
pub async fn demo(config: &Config) -> Result<()> {
    let latency = Duration::from_millis(if config.latency_ms > 0 {
        config.latency_ms
    } else {
        DEMO_LATENCY_MS
    });

    caching_section(latency, config)?;
    timing_section(latency)?;
    access_section(latency)?;

    Ok(())
}

fn caching_section(latency: Duration, config: &Config) -> Result<()> {
    println!("=== Caching proxy ===");

    let store = BoundedCache::new(
        config.max_entries.unwrap_or(DEMO_MAX_ENTRIES),
        Some(Duration::from_secs(config.ttl_secs.unwrap_or(DEMO_TTL_SECS))),
    );
    let cache =
        MemoizingLookupCache::with_cache(PrefixProvider::default().with_latency(latency), store);

    for key in ["user1", "user1", "user2"] {
        let before = cache.stats().misses;
        let value = cache.get(key)?;
        let source = if cache.stats().misses > before {
            "backend"
        } else {
            "cache"
        };
        println!("get({}) -> {} (from {})", key, value, source);
    }

    let snapshot = cache.cache().snapshot();
    println!(
        "Store: {}",
        serde_json::to_string(&snapshot).context("Failed to serialize store snapshot")?
    );
    println!(
        "Stats: {}",
        serde_json::to_string(&cache.stats()).context("Failed to serialize lookup stats")?
    );
    Ok(())
}

fn timing_section(latency: Duration) -> Result<()> {
    println!("\n=== Interception ===");

    let timing = Arc::new(TimingInterceptor::new());
    let timed = Intercepted::new(PrefixProvider::default().with_latency(latency)).with(timing.clone());
    let cache = MemoizingLookupCache::new(timed);

    for key in ["user1", "user1", "user1"] {
        // Only the first request reaches the timed backend
        let value = cache.get(key)?;
        println!("get({}) -> {}", key, value);
    }

    println!(
        "Backend calls observed: {}, total time {:.0}ms",
        timing.observed_calls(),
        timing.total_elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn access_section(latency: Duration) -> Result<()> {
    println!("\n=== Access control ===");

    let grants = parse_grants(&["admin=all", "user=user*,product*", "guest=user1"])?;
    let access = Arc::new(AccessControl::new(grants));
    let cache = MemoizingLookupCache::new(PrefixProvider::default().with_latency(latency));
    let secure = Intercepted::new(&cache).with(access.clone());

    println!("Anonymous request:");
    report(&secure, "user1");

    println!("\nLogged in as guest:");
    access.login("guest");
    report(&secure, "user1");
    report(&secure, "product1");

    println!("\nLogged in as admin:");
    access.logout();
    access.login("admin");
    report(&secure, "product1");

    println!("\nAudit trail (last 5):");
    let log = access.audit_log();
    for entry in log.iter().skip(log.len().saturating_sub(5)) {
        println!("  {}", entry);
    }
    Ok(())
}

fn report(provider: &impl Provider, key: &str) {
    match provider.get(key) {
        Ok(value) => println!("  ok: {} -> {}", key, value),
        Err(e) => println!("  refused: {}", e),
    }
}
