//! Provider trait for the external pricing call.

use async_trait::async_trait;

use crate::classify::{FetchOutcome, TransportFailure};
use crate::types::RateQuery;

/// Raw HTTP answer from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl From<ProviderResponse> for FetchOutcome {
    fn from(response: ProviderResponse) -> Self {
        FetchOutcome::Response {
            status: response.status,
            body: response.body,
        }
    }
}

/// The external pricing provider.
///
/// Implementations report every HTTP answer, whatever its status, as
/// `Ok`, and reserve `Err` for calls that got no answer at all. They must
/// bound the call with their own connect/read timeouts.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Request the rate for one query.
    async fn call_provider(
        &self,
        query: &RateQuery,
    ) -> std::result::Result<ProviderResponse, TransportFailure>;
}
