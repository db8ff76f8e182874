//! Telemetry metric name constants.
//!
//! Centralised metric names for pricing shield operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `pricing_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).

/// Lookups answered by a fresh cache entry.
pub const CACHE_HITS_TOTAL: &str = "pricing_cache_hits_total";

/// Lookups that won the recompute claim and called the compute function.
pub const CACHE_MISSES_TOTAL: &str = "pricing_cache_misses_total";

/// Lookups answered by a stale entry while another caller recomputed.
pub const CACHE_STALE_SERVED_TOTAL: &str = "pricing_cache_stale_served_total";

/// Provider calls made.
///
/// Labels: `status` ("ok" or a failure kind, e.g. "rate_limited").
pub const PROVIDER_REQUESTS_TOTAL: &str = "pricing_provider_requests_total";

/// Provider call duration in seconds.
pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "pricing_provider_request_duration_seconds";

/// Circuit breaker trips.
///
/// Labels: `kind` (the failure kind that tripped it).
pub const BREAKER_TRIPS_TOTAL: &str = "pricing_breaker_trips_total";

/// Lookups rejected because the circuit was open.
pub const BREAKER_REJECTIONS_TOTAL: &str = "pricing_breaker_rejections_total";

/// Failed store operations.
///
/// Labels: `operation` ("read" | "write" | "claim" | "release" |
/// "breaker_check" | "breaker_trip").
pub const STORE_ERRORS_TOTAL: &str = "pricing_store_errors_total";
