//! HTTP client for the pricing provider.
//!
//! `POST {base_url}/pricing` with a JSON [`RateRequest`] body and an optional
//! `token` header. Every answer is returned raw; interpretation belongs to
//! the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::traits::{ProviderResponse, RateProvider};
use crate::classify::TransportFailure;
use crate::types::{RateQuery, RateRequest};
use crate::{PricingError, Result};

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default overall request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

const PRICING_PATH: &str = "/pricing";

/// Client for the pricing provider's HTTP API.
#[derive(Clone)]
pub struct HttpRateProvider {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRateProvider {
    /// Create a client with the default timeouts.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                PricingError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `token` as the provider's `token` header.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        "rate-api"
    }

    async fn call_provider(
        &self,
        query: &RateQuery,
    ) -> std::result::Result<ProviderResponse, TransportFailure> {
        let url = format!("{}{PRICING_PATH}", self.base_url);

        let mut request = self.http.post(&url).json(&RateRequest::from(query));
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }

        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_failure)?;

        Ok(ProviderResponse { status, body })
    }
}

/// Map a reqwest failure onto the transport failure kinds.
fn transport_failure(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else {
        TransportFailure::Socket(err.to_string())
    }
}
