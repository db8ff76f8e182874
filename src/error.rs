//! Pricing shield error types

use std::sync::Arc;
use std::time::Duration;

use crate::classify::{FailureKind, FetchOutcome, TransportFailure};
use crate::store::StoreError;

/// Pricing shield error types
///
/// `Clone` so that one recompute's failure can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PricingError {
    // Breaker
    #[error("circuit open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    // Provider/network errors
    #[error("rate limited by provider (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("provider overloaded (HTTP {status})")]
    ProviderOverloaded { status: u16 },

    #[error("provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(TransportFailure),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    // Store errors
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Another caller holds the recompute claim and no value appeared
    /// within the bounded wait.
    #[error("timed out after {waited:?} waiting for in-flight lookup of {key}")]
    ClaimTimeout { key: String, waited: Duration },

    // Input errors
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PricingError {
    /// Build the public error for a classified provider failure.
    pub fn from_failure(kind: FailureKind, outcome: FetchOutcome) -> Self {
        match (kind, outcome) {
            (_, FetchOutcome::Transport(failure)) => PricingError::Transport(failure),
            (FailureKind::RateLimited, FetchOutcome::Response { status, .. }) => {
                PricingError::RateLimited { status }
            }
            (FailureKind::ProviderOverloaded, FetchOutcome::Response { status, .. }) => {
                PricingError::ProviderOverloaded { status }
            }
            (FailureKind::MalformedResponse, FetchOutcome::Response { status, body }) => {
                PricingError::MalformedResponse(format!(
                    "HTTP {status} body did not contain a matching rate ({} bytes)",
                    body.len()
                ))
            }
            (_, FetchOutcome::Response { status, body }) => PricingError::Provider { status, body },
        }
    }

    /// Whether a caller may simply retry.
    ///
    /// Everything the provider, breaker or store can produce is transient;
    /// the breaker turns immediate retries into cheap `CircuitOpen` failures.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            PricingError::InvalidQuery(_)
                | PricingError::Configuration(_)
                | PricingError::Json(_)
                | PricingError::Internal(_)
        )
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::CircuitOpen { .. } => "circuit_open",
            PricingError::RateLimited { .. } => "rate_limited",
            PricingError::ProviderOverloaded { .. } => "provider_overloaded",
            PricingError::Provider { .. } => "provider_error",
            PricingError::Transport(_) => "transport_failure",
            PricingError::MalformedResponse(_) => "malformed_response",
            PricingError::StoreUnavailable(_) => "store_unavailable",
            PricingError::ClaimTimeout { .. } => "claim_timeout",
            PricingError::InvalidQuery(_) => "invalid_query",
            PricingError::Configuration(_) => "configuration",
            PricingError::Json(_) => "json",
            PricingError::Internal(_) => "internal",
        }
    }

    /// Human-readable message for the end caller, distinct per kind.
    pub fn user_message(&self) -> String {
        match self {
            PricingError::CircuitOpen { retry_after } => format!(
                "Rate service is cooling down. Please try again in {}s.",
                retry_after.as_millis().div_ceil(1000).max(1)
            ),
            PricingError::RateLimited { .. } => {
                "Rate API rate limit exceeded. Scaling back requests.".to_string()
            }
            PricingError::ProviderOverloaded { .. } => {
                "External pricing provider is currently overloaded. Please try again later."
                    .to_string()
            }
            PricingError::Provider { status, .. } => {
                format!("Failed to fetch rate from API: {status}")
            }
            PricingError::Transport(_) => {
                "Rate service temporarily unavailable. Please try again shortly.".to_string()
            }
            PricingError::MalformedResponse(_) => {
                "Rate API returned an unusable response.".to_string()
            }
            PricingError::StoreUnavailable(_) | PricingError::ClaimTimeout { .. } => {
                "Rate lookup is temporarily unavailable. Please try again shortly.".to_string()
            }
            PricingError::InvalidQuery(msg) => format!("Invalid rate query: {msg}"),
            PricingError::Configuration(_)
            | PricingError::Json(_)
            | PricingError::Internal(_) => "Unexpected error while fetching rate.".to_string(),
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(err: serde_json::Error) -> Self {
        PricingError::Json(Arc::new(err))
    }
}

impl From<StoreError> for PricingError {
    fn from(err: StoreError) -> Self {
        PricingError::StoreUnavailable(err.to_string())
    }
}

/// Result type alias for pricing shield operations
pub type Result<T> = std::result::Result<T, PricingError>;
