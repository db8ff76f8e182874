//! The rate fetch orchestrator.
//!
//! ```text
//! fetch_rate(query)
//!     → breaker.check(provider key)      open → CircuitOpen (no cache, no provider)
//!     → cache.fetch_or_compute(key, ttl, race_grace, provider call)
//!           provider call:
//!             → breaker re-check         open → CircuitOpen
//!             → RateProvider::call_provider (bounded by provider_timeout)
//!             → 2xx + matching entry     → Value / NoData
//!             → otherwise classify()     breaker-worthy → trip
//!                                        → Failed(typed error), never cached
//!     → Rate { value, source } or PricingError
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{PricingConfig, PricingServiceBuilder};
use crate::breaker::CircuitBreaker;
use crate::cache::{ComputeOutcome, Lookup, StampedeCache};
use crate::classify::{FailureKind, FetchOutcome, TransportFailure, classify};
use crate::providers::RateProvider;
use crate::store::KeyValueStore;
use crate::telemetry;
use crate::types::{Rate, RateQuery, RateResponse, RateSource};
use crate::{PricingError, Result};

/// Resilient rate lookups against a single pricing provider.
///
/// Holds its collaborators explicitly: the provider, a circuit breaker and a
/// stampede-protected cache, the latter two over one shared store. Cheap to
/// share behind an `Arc`; all methods take `&self`.
pub struct PricingService {
    provider: Arc<dyn RateProvider>,
    breaker: CircuitBreaker,
    cache: StampedeCache,
    config: PricingConfig,
}

impl PricingService {
    /// Create a new builder for configuring the service.
    pub fn builder() -> PricingServiceBuilder {
        PricingServiceBuilder::new()
    }

    /// Wire a service from its parts. Unlike [`builder`](Self::builder) this
    /// does not [validate](PricingConfig::validate) `config`.
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: Arc<dyn KeyValueStore>,
        config: PricingConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(Arc::clone(&store), config.breaker_cool_down);
        let cache = StampedeCache::new(store, config.cache.clone());
        Self {
            provider,
            breaker,
            cache,
            config,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cache(&self) -> &StampedeCache {
        &self.cache
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Fetch the rate for `query`.
    ///
    /// Fails fast with [`PricingError::CircuitOpen`] while the provider
    /// breaker is open. Every failure is logged once, tagged with a per-call
    /// trace id and the query's hotel and room.
    pub async fn fetch_rate(&self, query: &RateQuery) -> Result<Rate> {
        let trace_id = Uuid::new_v4();
        let result = self.lookup(query, trace_id).await;
        if let Err(e) = &result {
            error!(
                trace_id = %trace_id,
                hotel = %query.hotel,
                room = %query.room,
                kind = e.kind(),
                error = %e,
                "{}",
                e.user_message()
            );
        }
        result
    }

    /// Events emitted anywhere below, the recompute task included, carry the
    /// span's `trace_id`, `hotel` and `room`.
    #[instrument(
        name = "fetch_rate",
        skip_all,
        fields(trace_id = %trace_id, hotel = %query.hotel, room = %query.room)
    )]
    async fn lookup(&self, query: &RateQuery, trace_id: Uuid) -> Result<Rate> {
        query.validate()?;

        if let Some(state) = self.breaker.check(&self.config.breaker_key).await {
            metrics::counter!(telemetry::BREAKER_REJECTIONS_TOTAL).increment(1);
            return Err(PricingError::CircuitOpen {
                retry_after: state.remaining(),
            });
        }

        let call = ProviderCall {
            provider: Arc::clone(&self.provider),
            breaker: self.breaker.clone(),
            breaker_key: self.config.breaker_key.clone(),
            timeout: self.config.provider_timeout,
            query: query.clone(),
            trace_id,
        };

        let key = query.cache_key();
        let lookup = self
            .cache
            .fetch_or_compute(
                key.as_str(),
                self.config.cache_ttl,
                self.config.race_grace,
                move || call.run(),
            )
            .await?;

        match lookup {
            Lookup::Hit(value) => Ok(Rate {
                value,
                source: RateSource::Cache,
            }),
            Lookup::Stale(value) => Ok(Rate {
                value,
                source: RateSource::Stale,
            }),
            Lookup::Computed(value) => Ok(Rate {
                value,
                source: RateSource::Provider,
            }),
            Lookup::NoData => Err(PricingError::MalformedResponse(
                "matching rate entry carried no rate".to_string(),
            )),
        }
    }
}

/// One provider call, owned so it can run on the cache's recompute task.
struct ProviderCall {
    provider: Arc<dyn RateProvider>,
    breaker: CircuitBreaker,
    breaker_key: String,
    timeout: Duration,
    query: RateQuery,
    trace_id: Uuid,
}

impl ProviderCall {
    async fn run(self) -> ComputeOutcome {
        // Claim losers retrying after a winner's failure land here too; they
        // must not call a provider the winner has just tripped on.
        if let Some(state) = self.breaker.check(&self.breaker_key).await {
            metrics::counter!(telemetry::BREAKER_REJECTIONS_TOTAL).increment(1);
            return ComputeOutcome::Failed(PricingError::CircuitOpen {
                retry_after: state.remaining(),
            });
        }

        info!(
            trace_id = %self.trace_id,
            hotel = %self.query.hotel,
            room = %self.query.room,
            provider = self.provider.name(),
            "cache miss, fetching rate from provider"
        );

        let started = Instant::now();
        let outcome: FetchOutcome =
            match tokio::time::timeout(self.timeout, self.provider.call_provider(&self.query))
                .await
            {
                Ok(Ok(response)) => response.into(),
                Ok(Err(failure)) => FetchOutcome::Transport(failure),
                Err(_) => FetchOutcome::Transport(TransportFailure::Timeout(format!(
                    "no answer within {:?}",
                    self.timeout
                ))),
            };
        metrics::histogram!(telemetry::PROVIDER_REQUEST_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let malformed = match &outcome {
            FetchOutcome::Response { body, .. } if outcome.is_success() => {
                match parse_rate(body, &self.query) {
                    Ok(rate) => {
                        metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL, "status" => "ok")
                            .increment(1);
                        return rate.map_or(ComputeOutcome::NoData, ComputeOutcome::Value);
                    }
                    Err(reason) => Some(reason),
                }
            }
            _ => None,
        };

        let kind = classify(&outcome);
        metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL, "status" => kind.as_str())
            .increment(1);
        if kind.is_breaker_worthy() {
            self.trip(kind).await;
        }

        let error = match malformed {
            Some(reason) => PricingError::MalformedResponse(reason),
            None => PricingError::from_failure(kind, outcome),
        };
        ComputeOutcome::Failed(error)
    }

    async fn trip(&self, kind: FailureKind) {
        metrics::counter!(telemetry::BREAKER_TRIPS_TOTAL, "kind" => kind.as_str()).increment(1);
        match self.breaker.trip(&self.breaker_key).await {
            Ok(()) => warn!(
                trace_id = %self.trace_id,
                hotel = %self.query.hotel,
                room = %self.query.room,
                kind = %kind,
                cool_down_secs = self.breaker.cool_down().as_secs(),
                "provider failure tripped circuit breaker"
            ),
            Err(e) => {
                metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "operation" => "breaker_trip")
                    .increment(1);
                warn!(
                    trace_id = %self.trace_id,
                    hotel = %self.query.hotel,
                    room = %self.query.room,
                    kind = %kind,
                    error = %e,
                    "failed to trip circuit breaker"
                );
            }
        }
    }
}

/// Pick the rate for `query` out of a 2xx body.
///
/// `Ok(None)` is a matching entry without a rate; `Err` is a body that does
/// not parse or has no matching entry.
fn parse_rate(body: &str, query: &RateQuery) -> std::result::Result<Option<String>, String> {
    let response =
        RateResponse::parse(body).map_err(|e| format!("response body did not parse: {e}"))?;
    let entry = response.find(query).ok_or_else(|| {
        format!(
            "no rate entry for period={} hotel={} room={}",
            query.period, query.hotel, query.room
        )
    })?;
    Ok(entry.rate_value())
}
