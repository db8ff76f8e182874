//! In-process [`KeyValueStore`] backed by moka.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::{KeyValueStore, StoreResult};
use crate::cache::CLAIM_SUFFIX;
use crate::types::CACHE_KEY_PREFIX;

/// Default maximum number of rate entries held by a [`MemoryStore`].
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Marker value written for claims.
const CLAIM_MARKER: &str = "claimed";

#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    ttl: Duration,
}

/// Expiry policy that honours the TTL carried by each value.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe in-memory store with per-key TTL and atomic claims.
///
/// Cloning is cheap and clones share the same underlying maps, so one
/// instance can back both the cache and the breaker. Expiry is passive:
/// an expired key reads as absent and is evicted lazily by moka.
///
/// Only rate entries (keys under [`CACHE_KEY_PREFIX`]) count against the
/// capacity and may be evicted to make room; a rate entry is recomputed when
/// it goes missing. Claims, breaker state and every other key live in a
/// separate map that is bounded only by expiry, so a full store never drops
/// them.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
    pinned: Cache<String, StoredValue>,
}

impl MemoryStore {
    /// Create an empty store with the default capacity (10,000 rate entries).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store holding at most `max` rate entries.
    pub fn with_max_entries(max: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max)
            .expire_after(PerEntryTtl)
            .build();
        let pinned = Cache::builder().expire_after(PerEntryTtl).build();
        Self { entries, pinned }
    }

    /// Approximate number of live keys.
    pub fn len(&self) -> u64 {
        self.entries.entry_count() + self.pinned.entry_count()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict everything.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.pinned.invalidate_all();
    }

    /// Apply pending evictions and expirations now instead of lazily.
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
        self.pinned.run_pending_tasks().await;
    }

    fn map_for(&self, key: &str) -> &Cache<String, StoredValue> {
        if key.starts_with(CACHE_KEY_PREFIX) && !key.ends_with(CLAIM_SUFFIX) {
            &self.entries
        } else {
            &self.pinned
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.map_for(key).get(key).await.map(|stored| stored.value))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        self.map_for(key)
            .insert(key.to_owned(), StoredValue { value, ttl })
            .await;
        Ok(())
    }

    async fn try_claim(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        // `or_insert_with` serialises concurrent initialisers for one key;
        // only the caller whose future was evaluated sees a fresh entry.
        let entry = self
            .map_for(key)
            .entry(key.to_owned())
            .or_insert_with(async move {
                StoredValue {
                    value: CLAIM_MARKER.to_string(),
                    ttl,
                }
            })
            .await;
        Ok(entry.is_fresh())
    }

    async fn release_claim(&self, key: &str) -> StoreResult<()> {
        self.map_for(key).invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.map_for(key).contains_key(key))
    }
}
