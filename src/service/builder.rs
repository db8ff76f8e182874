//! Builder for configuring [`PricingService`] instances.

use std::sync::Arc;

use super::{PricingConfig, PricingService};
use crate::providers::{HttpRateProvider, RateProvider};
use crate::store::{KeyValueStore, MemoryStore};
use crate::{PricingError, Result};

/// Builder for configuring [`PricingService`] instances.
///
/// A provider is required: either an explicit [`RateProvider`] or the HTTP
/// provider via [`rate_api`](Self::rate_api). The store defaults to a fresh
/// [`MemoryStore`].
pub struct PricingServiceBuilder {
    provider: Option<Arc<dyn RateProvider>>,
    rate_api_url: Option<String>,
    rate_api_token: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    config: PricingConfig,
}

impl PricingServiceBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            rate_api_url: None,
            rate_api_token: None,
            store: None,
            config: PricingConfig::default(),
        }
    }

    /// Use a custom provider implementation.
    pub fn provider(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use the HTTP provider at `base_url`.
    pub fn rate_api(mut self, base_url: impl Into<String>) -> Self {
        self.rate_api_url = Some(base_url.into());
        self
    }

    /// Token header for the HTTP provider.
    pub fn rate_api_token(mut self, token: impl Into<String>) -> Self {
        self.rate_api_token = Some(token.into());
        self
    }

    /// Share an existing store (e.g. with other service instances).
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: PricingConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the service.
    ///
    /// Fails with [`PricingError::Configuration`] when the config does not
    /// [validate](PricingConfig::validate) or no provider is set. An explicit
    /// provider takes precedence over [`rate_api`](Self::rate_api).
    pub fn build(self) -> Result<PricingService> {
        self.config.validate()?;

        let provider = match (self.provider, self.rate_api_url) {
            (Some(provider), _) => provider,
            (None, Some(url)) => {
                let mut http = HttpRateProvider::with_timeouts(
                    url,
                    self.config.provider_timeout,
                    self.config.connect_timeout,
                )?;
                if let Some(token) = self.rate_api_token {
                    http = http.with_token(token);
                }
                Arc::new(http)
            }
            (None, None) => {
                return Err(PricingError::Configuration(
                    "no rate provider configured".to_string(),
                ));
            }
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        Ok(PricingService::new(provider, store, self.config))
    }
}

impl Default for PricingServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
