//! Key-value store abstraction shared by the cache and the circuit breaker.
//!
//! The store is injected, never ambient: the cache and breaker receive an
//! `Arc<dyn KeyValueStore>` at construction. They may share one physical
//! store because they use disjoint key namespaces:
//!
//! - cache entries: `pricing/v1/{hotel}/{room}/{period}`
//! - recompute claims: `{cache key}#claim`
//! - breaker state: the configured breaker key (`circuit_breaker:...`)
//!
//! Implementations must make [`KeyValueStore::try_claim`] atomic with
//! respect to every other caller of the same store, and must report an
//! unreachable backend as [`StoreError`], never as "key absent".

mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;

/// Failures of the backing store itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unreachable: {0}")]
    Unavailable(String),

    /// The backend was reached but rejected the operation.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// String-valued key-value store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a live value. Expired keys read as `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write (or overwrite) a value that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Atomically create `key` with expiry `ttl` if it does not exist.
    ///
    /// Returns `true` for exactly one of any number of concurrent callers
    /// while the key is absent.
    async fn try_claim(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remove a claim created by [`try_claim`](Self::try_claim).
    async fn release_claim(&self, key: &str) -> StoreResult<()>;

    /// Whether a live value exists for `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Records persisted in the store carry absolute timestamps so that several
/// processes sharing one backend agree on their age.
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
