//! Pricing Shield - resilient rate lookups against a fragile pricing provider
//!
//! This crate fetches the price for a (period, hotel, room) tuple from a
//! remote, rate-limited and occasionally overloaded provider, and shields
//! callers from its latency, rate limits and outages with:
//!
//! - a stampede-protected cache-aside layer ([`cache`]): one provider call
//!   per expiry per key, stale values served to concurrent callers, failures
//!   never cached;
//! - a provider-wide circuit breaker ([`breaker`]) tripped by rate limiting,
//!   overload and transport failures, failing fast for a cool-down;
//! - an injected [`KeyValueStore`](store::KeyValueStore) backing both.
//!
//! # Example
//!
//! ```rust,no_run
//! use pricing_shield::{PricingService, RateQuery};
//!
//! #[tokio::main]
//! async fn main() -> pricing_shield::Result<()> {
//!     let service = PricingService::builder()
//!         .rate_api("http://localhost:8080")
//!         .build()?;
//!
//!     let rate = service
//!         .fetch_rate(&RateQuery::new("Summer", "FloatingPointResort", "SingletonRoom"))
//!         .await?;
//!
//!     println!("{rate}");
//!     Ok(())
//! }
//! ```

pub mod breaker;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod providers;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use breaker::{CircuitBreaker, CircuitState};
pub use classify::{FailureKind, FetchOutcome, TransportFailure, classify};
pub use error::{PricingError, Result};
pub use service::{PricingConfig, PricingService, PricingServiceBuilder};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use types::{CacheKey, Rate, RateQuery, RateSource};
pub use version::{PKG_VERSION, version_string};
