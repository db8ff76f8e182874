//! Cache-aside orchestration with single-flight recomputation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{Instrument, Span, debug, warn};

use super::CacheEntry;
use crate::store::KeyValueStore;
use crate::telemetry;
use crate::{PricingError, Result};

/// Suffix appended to a cache key to form its claim key.
pub(crate) const CLAIM_SUFFIX: &str = "#claim";

/// Claim key guarding recomputation of `key`.
pub fn claim_key(key: &str) -> String {
    format!("{key}{CLAIM_SUFFIX}")
}

/// Claim and wait policy for [`StampedeCache`].
///
/// ```rust
/// # use pricing_shield::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .claim_ttl(Duration::from_secs(10))
///     .claim_wait(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a recompute claim; bounds how long a crashed winner can
    /// block recomputation. Default: 15s.
    pub claim_ttl: Duration,
    /// Longest a claim loser with nothing to serve waits for the winner.
    /// Default: 6s.
    pub claim_wait: Duration,
    /// How often a waiting loser re-reads the store. Default: 25ms.
    pub poll_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            claim_ttl: Duration::from_secs(15),
            claim_wait: Duration::from_secs(6),
            poll_interval: Duration::from_millis(25),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the claim lifetime.
    pub fn claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    /// Set the bounded wait for claim losers.
    pub fn claim_wait(mut self, wait: Duration) -> Self {
        self.claim_wait = wait;
        self
    }

    /// Set the polling interval for claim losers.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Result of a recomputation.
///
/// Only `Value` is ever cached. `NoData` and `Failed` leave the store exactly
/// as it was.
#[derive(Debug)]
pub enum ComputeOutcome {
    Value(String),
    /// The computation succeeded but produced nothing cacheable.
    NoData,
    Failed(PricingError),
}

/// How [`StampedeCache::fetch_or_compute`] obtained its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Fresh entry, no computation.
    Hit(String),
    /// Expired entry served while another caller recomputes.
    Stale(String),
    /// Computed by this caller and written to the store.
    Computed(String),
    /// Computed by this caller, nothing to cache.
    NoData,
}

impl Lookup {
    /// How a caller that waited on someone else's recompute sees its result.
    fn for_waiter(self) -> Self {
        match self {
            Lookup::Computed(v) => Lookup::Hit(v),
            other => other,
        }
    }

    /// The value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Lookup::Hit(v) | Lookup::Stale(v) | Lookup::Computed(v) => Some(v),
            Lookup::NoData => None,
        }
    }
}

/// Result of a recompute, published to in-process waiters once known.
type Published = Option<Result<Lookup>>;

/// Recomputes running in this process, by claim key.
type InFlight = Arc<Mutex<HashMap<String, watch::Receiver<Published>>>>;

/// Removes a recompute from the in-flight registry when dropped, including
/// when its task panics.
struct InFlightEntry {
    registry: InFlight,
    claim: String,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.claim);
    }
}

/// Stampede-protected cache over a shared [`KeyValueStore`].
///
/// See the [module docs](super) for the protocol. Clones share the store
/// and the registry of in-flight recomputes.
#[derive(Clone)]
pub struct StampedeCache {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    in_flight: InFlight,
}

impl StampedeCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            in_flight: Arc::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read the entry under `key`, fresh or stale.
    ///
    /// An undecodable entry reads as absent so that it gets recomputed.
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match CacheEntry::decode(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Return the fresh value for `key`, or have exactly one caller compute it.
    ///
    /// At most one `compute` runs per key at any instant across every caller
    /// sharing the store. Losers serve the stale entry when there is one, and
    /// otherwise wait up to `claim_wait` for the winner before failing with
    /// [`PricingError::ClaimTimeout`]. Losers in the same process receive the
    /// winner's result, failure included. Losers elsewhere observe the
    /// released claim and either read the new entry or claim in turn.
    ///
    /// Store failures while reading or claiming fail the lookup (fail closed).
    pub async fn fetch_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        stale_grace: Duration,
        compute: F,
    ) -> Result<Lookup>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ComputeOutcome> + Send + 'static,
    {
        let claim = claim_key(key);
        let started = Instant::now();
        let mut waiting = false;

        loop {
            let current = self.read(key).await.inspect_err(|_| store_error("read"))?;
            if let Some(entry) = &current
                && entry.is_fresh()
            {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                return Ok(Lookup::Hit(entry.value.clone()));
            }

            let won = self
                .store
                .try_claim(&claim, self.config.claim_ttl)
                .await
                .inspect_err(|_| store_error("claim"))?;

            if won {
                // Another winner may have written between our read and claim.
                match self.read(key).await {
                    Ok(Some(entry)) if entry.is_fresh() => {
                        release(self.store.as_ref(), &claim).await;
                        metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                        return Ok(Lookup::Hit(entry.value));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        store_error("read");
                        release(self.store.as_ref(), &claim).await;
                        return Err(e);
                    }
                }
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                return self
                    .recompute(key, claim, ttl, stale_grace, compute)
                    .await;
            }

            if let Some(entry) = current {
                metrics::counter!(telemetry::CACHE_STALE_SERVED_TOTAL).increment(1);
                debug!(key, "recompute in flight elsewhere, serving stale entry");
                return Ok(Lookup::Stale(entry.value));
            }

            if !waiting {
                debug!(key, "recompute in flight elsewhere, waiting for it");
                waiting = true;
            }
            let remaining = self.config.claim_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(self.claim_timeout(key, started));
            }

            if let Some(mut result) = self.in_flight(&claim) {
                match tokio::time::timeout(remaining, result.wait_for(Option::is_some)).await {
                    Ok(Ok(published)) => {
                        if let Some(outcome) = published.clone() {
                            return outcome.map(Lookup::for_waiter);
                        }
                    }
                    // The recompute died without publishing; go round again.
                    Ok(Err(_)) => {}
                    Err(_) => return Err(self.claim_timeout(key, started)),
                }
                continue;
            }

            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }

    fn claim_timeout(&self, key: &str, started: Instant) -> PricingError {
        PricingError::ClaimTimeout {
            key: key.to_owned(),
            waited: started.elapsed(),
        }
    }

    /// Result channel of a recompute this process is running for `claim`.
    fn in_flight(&self, claim: &str) -> Option<watch::Receiver<Published>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(claim)
            .cloned()
    }

    /// Register a recompute for `claim` and return its publishing side.
    fn register(&self, claim: &str) -> (watch::Sender<Published>, InFlightEntry) {
        let (tx, rx) = watch::channel(None);
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(claim.to_owned(), rx);
        let entry = InFlightEntry {
            registry: Arc::clone(&self.in_flight),
            claim: claim.to_owned(),
        };
        (tx, entry)
    }

    /// Run `compute` as the claim holder on a detached task.
    async fn recompute<F, Fut>(
        &self,
        key: &str,
        claim: String,
        ttl: Duration,
        stale_grace: Duration,
        compute: F,
    ) -> Result<Lookup>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ComputeOutcome> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let key = key.to_owned();
        let (publish, entry) = self.register(&claim);

        let task = tokio::spawn(
            async move {
                let outcome = compute().await;
                let result = persist(store.as_ref(), &key, outcome, ttl, stale_grace).await;
                publish.send_replace(Some(result.clone()));
                // Unregister before releasing so no new caller picks up this result.
                drop(entry);
                release(store.as_ref(), &claim).await;
                result
            }
            .instrument(Span::current()),
        );

        task.await
            .map_err(|e| PricingError::Internal(format!("recompute task failed: {e}")))?
    }
}

/// Turn a compute outcome into a lookup, writing only successful values.
async fn persist(
    store: &dyn KeyValueStore,
    key: &str,
    outcome: ComputeOutcome,
    ttl: Duration,
    stale_grace: Duration,
) -> Result<Lookup> {
    match outcome {
        ComputeOutcome::Value(value) => {
            let encoded = CacheEntry::new(value.clone(), ttl).encode()?;
            if let Err(e) = store
                .set_with_ttl(key, encoded, ttl.saturating_add(stale_grace))
                .await
            {
                // The value is still good for this caller.
                store_error("write");
                warn!(key, error = %e, "failed to persist computed value");
            }
            Ok(Lookup::Computed(value))
        }
        ComputeOutcome::NoData => Ok(Lookup::NoData),
        ComputeOutcome::Failed(e) => Err(e),
    }
}

async fn release(store: &dyn KeyValueStore, claim: &str) {
    if let Err(e) = store.release_claim(claim).await {
        store_error("release");
        warn!(claim, error = %e, "failed to release claim, it will expire on its own");
    }
}

fn store_error(operation: &'static str) {
    metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "operation" => operation).increment(1);
}
