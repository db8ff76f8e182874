//! Store-backed circuit breaker.
//!
//! Open/closed state per logical resource key with a fixed cool-down. The
//! existence of a live [`CircuitState`] under the key means "open"; its
//! absence means "closed". There is no half-open state and no failure
//! counter: one breaker-worthy failure trips the circuit, and it closes
//! passively when the store expires the state after the cool-down.
//!
//! ```text
//! Closed --(breaker-worthy failure)--> Open --(cool-down elapses)--> Closed
//! ```
//!
//! Checks fail open: if the store is unreachable, [`CircuitBreaker::is_open`]
//! reports closed and logs the degradation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;
use crate::store::{KeyValueStore, StoreResult, unix_millis};
use crate::telemetry;

/// Default cool-down after a trip.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(30);

/// Persisted state of a tripped circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitState {
    /// When the circuit was (last) tripped, in Unix milliseconds.
    pub tripped_at_ms: u64,
    /// Cool-down window in milliseconds.
    pub cool_down_ms: u64,
}

impl CircuitState {
    fn new(tripped_at_ms: u64, cool_down: Duration) -> Self {
        Self {
            tripped_at_ms,
            cool_down_ms: cool_down.as_millis() as u64,
        }
    }

    /// Time left until the circuit closes, measured at `now_ms`.
    pub fn remaining_at(&self, now_ms: u64) -> Duration {
        let closes_at = self.tripped_at_ms.saturating_add(self.cool_down_ms);
        Duration::from_millis(closes_at.saturating_sub(now_ms))
    }

    /// Time left until the circuit closes.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(unix_millis())
    }
}

/// Circuit breaker over a shared [`KeyValueStore`].
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct CircuitBreaker {
    store: Arc<dyn KeyValueStore>,
    cool_down: Duration,
}

impl CircuitBreaker {
    /// Create a breaker with the given default cool-down.
    pub fn new(store: Arc<dyn KeyValueStore>, cool_down: Duration) -> Self {
        Self { store, cool_down }
    }

    /// Default cool-down used by [`trip`](Self::trip).
    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    /// Whether the circuit for `key` is open. Fails open.
    pub async fn is_open(&self, key: &str) -> bool {
        self.check(key).await.is_some()
    }

    /// The live state for `key`, or `None` when closed.
    ///
    /// Fails open: a store failure is logged and reported as closed, so an
    /// unhealthy store costs protection but never availability.
    pub async fn check(&self, key: &str) -> Option<CircuitState> {
        match self.state(key).await {
            Ok(state) => state,
            Err(e) => {
                metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "operation" => "breaker_check")
                    .increment(1);
                warn!(breaker = key, error = %e, "store unreachable checking circuit, failing open");
                None
            }
        }
    }

    /// The live state for `key`, surfacing store failures.
    pub async fn state(&self, key: &str) -> Result<Option<CircuitState>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CircuitState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(_) => {
                // Foreign writers may store a bare marker; presence alone means open.
                debug!(breaker = key, "undecodable circuit state, treating as freshly tripped");
                Ok(Some(CircuitState::new(unix_millis(), self.cool_down)))
            }
        }
    }

    /// Trip the circuit for `key` with the default cool-down.
    pub async fn trip(&self, key: &str) -> StoreResult<()> {
        self.trip_for(key, self.cool_down).await
    }

    /// Trip the circuit for `key`. Re-tripping an open circuit restarts the
    /// cool-down window (last trip wins).
    pub async fn trip_for(&self, key: &str, cool_down: Duration) -> StoreResult<()> {
        let state = CircuitState::new(unix_millis(), cool_down);
        let encoded = serde_json::to_string(&state)
            .map_err(|e| crate::store::StoreError::Backend(e.to_string()))?;
        self.store.set_with_ttl(key, encoded, cool_down).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_down() {
        let state = CircuitState::new(1_000, Duration::from_secs(30));
        assert_eq!(state.remaining_at(1_000), Duration::from_secs(30));
        assert_eq!(state.remaining_at(11_000), Duration::from_secs(20));
        assert_eq!(state.remaining_at(40_000), Duration::ZERO);
    }
}
