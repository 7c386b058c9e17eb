//! Integration tests for RedisCacheBackend.
//!
//! These tests run against a real Redis server using testcontainers.
//! Requires Docker to be available on the system.

mod common;

use common::TestRedis;
use jobboard_cache::{CacheBackend, ConnectionSupervisor, ListQuery, Namespace, QueryCache};
use jobboard_resilience::RetryPolicy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const JOBS: Namespace = Namespace::from_static("jobs");
const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_set_get_delete() {
    let redis = TestRedis::new().await;
    let backend = redis.backend();

    assert!(backend.set("jobs:item:1", b"payload", TTL).await);
    assert_eq!(backend.get("jobs:item:1").await.as_deref(), Some(&b"payload"[..]));

    assert!(backend.delete("jobs:item:1").await);
    assert_eq!(backend.get("jobs:item:1").await, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ttl_expires_entry() {
    let redis = TestRedis::new().await;
    let backend = redis.backend();

    assert!(backend.set("jobs:item:2", b"short", Duration::from_secs(1)).await);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(backend.get("jobs:item:2").await, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_pattern_scans_all_matches() {
    let redis = TestRedis::new().await;
    let backend = redis.backend();

    for i in 0..1_200 {
        backend.set(&format!("jobs:item:{}", i), b"x", TTL).await;
    }
    backend.set("companies:item:1", b"x", TTL).await;

    assert!(backend.delete_pattern("jobs:*").await);
    assert_eq!(backend.get("jobs:item:0").await, None);
    assert_eq!(backend.get("jobs:item:1199").await, None);
    assert!(backend.get("companies:item:1").await.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_query_cache_round_trip() {
    let redis = TestRedis::new().await;
    let cache = QueryCache::new(redis.backend());
    let query = ListQuery::from_parts(1, 10, "").unwrap();
    let calls = AtomicUsize::new(0);
    let compute = || async { Ok::<_, String>(calls.fetch_add(1, Ordering::SeqCst)) };

    assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 0);
    assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 0);

    assert!(cache.on_mutated(&JOBS).await);
    assert_eq!(cache.fetch_list(&JOBS, &query, TTL, compute).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unavailable_guard_short_circuits() {
    let redis = TestRedis::new().await;
    let backend = redis.backend();
    backend.set("jobs:item:3", b"cached", TTL).await;

    redis.guard().on_error("simulated outage");
    assert_eq!(backend.get("jobs:item:3").await, None);

    redis.guard().on_ready();
    assert!(backend.get("jobs:item:3").await.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_outage_invalidation_purged_on_reconnect() {
    let redis = TestRedis::new().await;
    let backend = redis.backend();
    let guard = redis.guard();
    let cache = QueryCache::new(backend.clone());
    backend.set("jobs:item:4", b"stale", TTL).await;
    backend.set("companies:item:4", b"kept", TTL).await;

    guard.on_error("partitioned");
    assert!(cache.on_mutated(&JOBS).await);

    let supervisor = Arc::new(ConnectionSupervisor::new(
        backend.clone(),
        Arc::clone(&guard),
        RetryPolicy::fixed(Duration::from_millis(50)),
        Duration::from_secs(60),
    ));
    let handle = Arc::clone(&supervisor).spawn();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !guard.is_available() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("supervisor should reconnect");

    assert_eq!(backend.get("jobs:item:4").await, None);
    assert!(backend.get("companies:item:4").await.is_some());

    supervisor.stop();
    handle.await.unwrap();
}
