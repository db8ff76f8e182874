//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pricing_shield::providers::{ProviderResponse, RateProvider};
use pricing_shield::store::StoreResult;
use pricing_shield::{KeyValueStore, MemoryStore, RateQuery, StoreError, TransportFailure};

/// Canned provider answer.
#[derive(Clone, Debug)]
pub enum Reply {
    Status(u16, String),
    Transport(TransportFailure),
}

/// Provider that returns a configurable reply and counts calls.
pub struct ScriptedProvider {
    reply: Mutex<Reply>,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// 200 with a single matching rate entry.
    pub fn rate(query: &RateQuery, rate: &str) -> Self {
        Self::new(Reply::Status(200, rates_body(query, rate)))
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::new(Reply::Status(status, body.to_string()))
    }

    pub fn connection_refused() -> Self {
        Self::new(Reply::Transport(TransportFailure::Connect(
            "connection refused".into(),
        )))
    }

    /// Delay every call, simulating a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call_provider(
        &self,
        _query: &RateQuery,
    ) -> Result<ProviderResponse, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Status(status, body) => Ok(ProviderResponse::new(status, body)),
            Reply::Transport(failure) => Err(failure),
        }
    }
}

/// Provider response body with one entry for `query`.
pub fn rates_body(query: &RateQuery, rate: &str) -> String {
    serde_json::json!({
        "rates": [{
            "period": query.period,
            "hotel": query.hotel,
            "room": query.room,
            "rate": rate,
        }]
    })
    .to_string()
}

/// Memory store whose operations can be made to fail on demand.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fail_claims: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is entirely unreachable.
    pub fn unreachable() -> Self {
        let store = Self::new();
        store.fail_reads(true);
        store.fail_writes(true);
        store.fail_claims(true);
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Self::check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn try_claim(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        Self::check(&self.fail_claims)?;
        self.inner.try_claim(key, ttl).await
    }

    async fn release_claim(&self, key: &str) -> StoreResult<()> {
        Self::check(&self.fail_claims)?;
        self.inner.release_claim(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Self::check(&self.fail_reads)?;
        self.inner.exists(key).await
    }
}
