//! Provider failure classification.
//!
//! [`classify`] maps a raw provider outcome onto a closed set of
//! [`FailureKind`]s. The orchestrator uses the kind for one decision only:
//! whether the failure is worth tripping the provider-wide circuit breaker.
//! The kind is then re-expressed as a public [`PricingError`](crate::PricingError).

use std::fmt;

/// Transport-level failure raised by a fetch function before any HTTP status
/// was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection refused, DNS failure, TLS handshake failure.
    Connect(String),
    /// Connect or read timeout elapsed.
    Timeout(String),
    /// Socket error after the connection was established.
    Socket(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Connect(msg) => write!(f, "connect failed: {msg}"),
            TransportFailure::Timeout(msg) => write!(f, "timed out: {msg}"),
            TransportFailure::Socket(msg) => write!(f, "socket error: {msg}"),
        }
    }
}

/// Raw outcome of a single provider call, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The provider answered with an HTTP status and body.
    Response { status: u16, body: String },
    /// No response was received.
    Transport(TransportFailure),
}

impl FetchOutcome {
    /// Whether the provider answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Response { status, .. } if (200..300).contains(status))
    }
}

/// Closed set of provider failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ProviderOverloaded,
    /// Any other non-2xx status.
    ProviderError,
    /// Connection refused, timeout, socket error.
    TransportFailure,
    /// 2xx status, but the body is unusable for the query.
    MalformedResponse,
}

impl FailureKind {
    /// Failures that indicate the provider as a whole is unhealthy.
    ///
    /// A 4xx other than 429, or one malformed body, says nothing about
    /// provider health and must not short-circuit later callers.
    pub fn is_breaker_worthy(self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited | FailureKind::ProviderOverloaded | FailureKind::TransportFailure
        )
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ProviderOverloaded => "provider_overloaded",
            FailureKind::ProviderError => "provider_error",
            FailureKind::TransportFailure => "transport_failure",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a provider outcome. Pure and total.
///
/// Only call this for outcomes that did not yield a usable rate: a 2xx
/// response reaching the classifier means its body could not be used.
pub fn classify(outcome: &FetchOutcome) -> FailureKind {
    match outcome {
        FetchOutcome::Transport(_) => FailureKind::TransportFailure,
        FetchOutcome::Response { status, .. } => match *status {
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ProviderOverloaded,
            200..=299 => FailureKind::MalformedResponse,
            _ => FailureKind::ProviderError,
        },
    }
}
