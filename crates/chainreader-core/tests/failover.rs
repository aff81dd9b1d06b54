//! End-to-end behaviour of pool + cache + executor with a mock network call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chainreader_core::{
    CacheConfig, ChainReaderError, Executor, HealthStatus, Params, PoolConfig, Provider,
    ProviderConfig, ProviderPool, RetryConfig, RetryPolicy, Ttl, TtlCache,
};
use futures::future::join_all;
use serde_json::Value;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn sample_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("provider1", "https://rpc1.example.com").with_priority(1),
        ProviderConfig::new("provider2", "https://rpc2.example.com").with_priority(2),
        ProviderConfig::new("provider3", "https://rpc3.example.com").with_priority(3),
    ]
}

fn build(threshold: u32, cooldown: Duration, max_retries: u32) -> Executor {
    let pool = ProviderPool::new(
        sample_providers(),
        PoolConfig {
            failover_threshold: threshold,
            health_check_cooldown: cooldown,
        },
    )
    .unwrap();
    Executor::new(
        Arc::new(pool),
        Arc::new(TtlCache::new(CacheConfig::default())),
        RetryPolicy::new(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }),
        Duration::from_secs(5),
    )
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn outage_failover_and_recovery() {
    let ex = build(2, Duration::from_secs(60), 3);
    let down = Arc::new(Mutex::new(HashSet::from(["provider1".to_string()])));
    let run = |p: Provider| {
        let down = down.clone();
        async move {
            if down.lock().unwrap().contains(&p.name) {
                Err(ChainReaderError::provider(p.name, "503 Service Unavailable"))
            } else {
                Ok(Value::String(p.name))
            }
        }
    };

    // provider1 fails twice in a row (backoff in between) and is taken out;
    // the third attempt lands on provider2.
    let first = ex
        .execute("get_balance", &Params::new().with("address", "0xa").with("block", "latest"), None, &run)
        .await
        .unwrap();
    assert_eq!(first, Value::from("provider2"));
    let stats = ex.pool().stats();
    assert_eq!(stats["provider1"].failure_count, 2);
    assert!(!stats["provider1"].is_healthy);

    let second = ex
        .execute("get_balance", &Params::new().with("address", "0xb").with("block", "latest"), None, &run)
        .await
        .unwrap();
    assert_eq!(second, Value::from("provider2"));
    assert!(!ex.pool().get("provider1").unwrap().is_healthy);
    assert_eq!(ex.pool().health(), HealthStatus::Degraded);

    // provider1 comes back; after the cooldown it is preferred again.
    down.lock().unwrap().clear();
    let recovered = ex.pool().recover(Instant::now() + Duration::from_secs(61));
    assert_eq!(recovered, 1);
    let third = ex
        .execute("get_balance", &Params::new().with("address", "0xc").with("block", "latest"), None, &run)
        .await
        .unwrap();
    assert_eq!(third, Value::from("provider1"));
}

#[tokio::test(start_paused = true)]
async fn all_down_is_reported_after_forced_recovery() {
    let ex = build(1, Duration::from_secs(300), 4);
    let calls = Arc::new(AtomicUsize::new(0));
    let run = |p: Provider| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Value, _>(ChainReaderError::provider(p.name, "Down"))
        }
    };

    let err = ex
        .execute("get_block_number", &Params::new(), None, run)
        .await
        .unwrap_err();
    assert!(matches!(err, ChainReaderError::AllProvidersFailed { attempts: 4, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    // Three providers failed once each, then forced recovery let provider1 go again.
    let stats = ex.pool().stats();
    assert_eq!(stats["provider1"].request_count, 2);
    assert_eq!(stats["provider2"].request_count, 1);
    assert_eq!(stats["provider3"].request_count, 1);
}

#[tokio::test]
async fn concurrent_requests_share_pool_and_cache() {
    let ex = Arc::new(build(3, Duration::from_secs(300), 3));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..32u64).map(|i| {
        let ex = ex.clone();
        let calls = calls.clone();
        async move {
            let params = Params::new().with("block_identifier", i % 4);
            ex.execute("get_block", &params, Some(10_000), |_p: Provider| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    Ok::<_, ChainReaderError>(Value::from(i % 4))
                }
            })
            .await
        }
    });
    let results = join_all(tasks).await;

    assert!(results.iter().all(|r| r.is_ok()));
    let cache = ex.cache().stats();
    assert_eq!(cache.hits + cache.misses, 32);
    assert_eq!(cache.size, 4);
    assert_eq!(calls.load(Ordering::SeqCst) as u64, cache.misses);

    let pool = ex.pool().stats();
    let total: u64 = pool.values().map(|s| s.success_count).sum();
    assert_eq!(total, cache.misses);
}

#[test]
fn eviction_scenario_keeps_size_at_cap() {
    let cache: TtlCache<String> = TtlCache::new(CacheConfig {
        max_cache_size: 3,
        ..Default::default()
    });
    let now = Instant::now();
    for (k, ttl) in [("k1", 10), ("k2", 20), ("k3", 30)] {
        cache
            .set_at(k, k.to_string(), Ttl::Expires(Duration::from_secs(ttl)), now)
            .unwrap();
    }
    cache
        .set_at("k4", "k4".into(), Ttl::Expires(Duration::from_secs(40)), now)
        .unwrap();

    assert_eq!(cache.stats().size, 3);
    assert!(cache.get_at("k1", now).unwrap().is_none());
    assert_eq!(cache.get_at("k4", now).unwrap().as_deref(), Some("k4"));
}
