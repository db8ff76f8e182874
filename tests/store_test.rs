//! Tests for [`MemoryStore`]: the in-process key-value store.

use std::sync::Arc;
use std::time::Duration;

use pricing_shield::{KeyValueStore, MemoryStore};

const LONG: Duration = Duration::from_secs(60);

#[tokio::test]
async fn miss_returns_none() {
    let store = MemoryStore::new();
    assert!(store.get("nonexistent").await.unwrap().is_none());
    assert!(!store.exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn set_then_get() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", "v".into(), LONG).await.unwrap();

    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    assert!(store.exists("k").await.unwrap());
}

#[tokio::test]
async fn overwrite_replaces_value() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", "first".into(), LONG).await.unwrap();
    store.set_with_ttl("k", "second".into(), LONG).await.unwrap();

    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn values_expire_after_their_own_ttl() {
    let store = MemoryStore::new();
    store
        .set_with_ttl("short", "v".into(), Duration::from_millis(50))
        .await
        .unwrap();
    store.set_with_ttl("long", "v".into(), LONG).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(store.get("short").await.unwrap().is_none());
    assert!(!store.exists("short").await.unwrap());
    assert!(store.get("long").await.unwrap().is_some());
}

#[tokio::test]
async fn overwrite_restarts_ttl() {
    let store = MemoryStore::new();
    store
        .set_with_ttl("k", "v1".into(), Duration::from_millis(100))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    store
        .set_with_ttl("k", "v2".into(), Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    // 140ms after the first write, 80ms after the second.
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn claim_is_exclusive_until_released() {
    let store = MemoryStore::new();

    assert!(store.try_claim("c", LONG).await.unwrap());
    assert!(!store.try_claim("c", LONG).await.unwrap());
    assert!(store.exists("c").await.unwrap());

    store.release_claim("c").await.unwrap();
    assert!(!store.exists("c").await.unwrap());
    assert!(store.try_claim("c", LONG).await.unwrap());
}

#[tokio::test]
async fn claim_expires_on_its_own() {
    let store = MemoryStore::new();
    assert!(store.try_claim("c", Duration::from_millis(50)).await.unwrap());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(store.try_claim("c", LONG).await.unwrap());
}

#[tokio::test]
async fn release_of_absent_claim_is_ok() {
    let store = MemoryStore::new();
    store.release_claim("never-claimed").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.try_claim("contended", LONG).await.unwrap() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn clones_share_state() {
    let store = MemoryStore::new();
    let other = store.clone();
    store.set_with_ttl("k", "v".into(), LONG).await.unwrap();

    assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn clear_evicts_everything() {
    let store = MemoryStore::default();
    store.set_with_ttl("a", "1".into(), LONG).await.unwrap();
    store.set_with_ttl("b", "2".into(), LONG).await.unwrap();

    store.clear();

    assert!(store.get("a").await.unwrap().is_none());
    assert!(store.get("b").await.unwrap().is_none());
}

#[tokio::test]
async fn full_store_keeps_breaker_state_and_claims() {
    let store = MemoryStore::with_max_entries(50);

    // Fill the rate-entry capacity with keys that are read often.
    for i in 0..50 {
        let key = format!("pricing/v1/H{i}/R1/Summer");
        store.set_with_ttl(&key, "200".into(), LONG).await.unwrap();
        for _ in 0..5 {
            store.get(&key).await.unwrap();
        }
    }
    store.run_pending_tasks().await;

    store
        .set_with_ttl("circuit_breaker:rate_api", "{}".into(), LONG)
        .await
        .unwrap();
    let claim = "pricing/v1/H0/R1/Summer#claim";
    assert!(store.try_claim(claim, LONG).await.unwrap());

    // More rate entries arrive and compete for the same capacity.
    for i in 50..200 {
        let key = format!("pricing/v1/H{i}/R1/Summer");
        store.set_with_ttl(&key, "200".into(), LONG).await.unwrap();
    }
    store.run_pending_tasks().await;

    assert!(store.exists("circuit_breaker:rate_api").await.unwrap());
    assert!(store.exists(claim).await.unwrap());
    assert!(!store.try_claim(claim, LONG).await.unwrap());
}
