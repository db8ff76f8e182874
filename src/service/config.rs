//! Runtime configuration for [`PricingService`](super::PricingService).

use std::time::Duration;

use crate::breaker::DEFAULT_COOL_DOWN;
use crate::cache::CacheConfig;
use crate::providers::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::{PricingError, Result};

/// Breaker key shared by every query against the provider.
pub const DEFAULT_BREAKER_KEY: &str = "circuit_breaker:rate_api";

/// Tuning for the fetch-and-cache layer.
///
/// ```rust
/// # use pricing_shield::PricingConfig;
/// # use std::time::Duration;
/// let config = PricingConfig::new()
///     .cache_ttl(Duration::from_secs(60))
///     .breaker_cool_down(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Freshness window of cached rates. Default: 5 minutes.
    pub cache_ttl: Duration,
    /// How long an expired rate stays servable to claim losers. Default: 10s.
    pub race_grace: Duration,
    /// Cool-down after a breaker-worthy failure. Default: 30s.
    pub breaker_cool_down: Duration,
    /// Store key of the provider-wide breaker.
    pub breaker_key: String,
    /// Outer bound on a single provider call. Default: 5s.
    pub provider_timeout: Duration,
    /// Connect timeout for the HTTP provider. Default: 2s.
    pub connect_timeout: Duration,
    /// Claim and wait policy of the cache.
    pub cache: CacheConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60),
            race_grace: Duration::from_secs(10),
            breaker_cool_down: DEFAULT_COOL_DOWN,
            breaker_key: DEFAULT_BREAKER_KEY.to_string(),
            provider_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            cache: CacheConfig::default(),
        }
    }
}

impl PricingConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn race_grace(mut self, grace: Duration) -> Self {
        self.race_grace = grace;
        self
    }

    pub fn breaker_cool_down(mut self, cool_down: Duration) -> Self {
        self.breaker_cool_down = cool_down;
        self
    }

    pub fn breaker_key(mut self, key: impl Into<String>) -> Self {
        self.breaker_key = key.into();
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Reject settings under which the cache cannot keep recomputes
    /// single-flight.
    ///
    /// A claim must outlive the longest provider call: `cache.claim_ttl`
    /// has to be strictly greater than `provider_timeout`.
    pub fn validate(&self) -> Result<()> {
        if self.cache.claim_ttl <= self.provider_timeout {
            return Err(PricingError::Configuration(format!(
                "claim_ttl ({:?}) must exceed provider_timeout ({:?})",
                self.cache.claim_ttl, self.provider_timeout
            )));
        }
        if self.breaker_key.is_empty() {
            return Err(PricingError::Configuration(
                "breaker_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
