//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.pricing-shield/config.toml` (user)
//! 3. `/etc/pricing-shield/config.toml` (system)
//! 4. built-in defaults
//!
//! Environment overrides applied after loading:
//! - `RATE_API_URL` replaces `provider.base_url`
//! - `RATE_API_TOKEN` supplies the provider `token` header (never read from file)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::service::{DEFAULT_BREAKER_KEY, PricingConfig, PricingService};
use crate::{PricingError, Result};

/// Environment variable overriding the provider base URL.
pub const RATE_API_URL_ENV: &str = "RATE_API_URL";

/// Environment variable holding the provider token.
pub const RATE_API_TOKEN_ENV: &str = "RATE_API_TOKEN";

/// File configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub breaker: BreakerSettings,
}

/// Pricing provider connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Provider base URL (default: http://localhost:8080).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Overall request timeout in seconds (default: 5).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds (default: 2).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Provider `token` header, from `RATE_API_TOKEN` only.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            token: None,
        }
    }
}

fn default_base_url() -> String {
    crate::providers::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    2
}

/// Rate cache tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Freshness window in seconds (default: 300).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Stale-serving grace in seconds (default: 10).
    #[serde(default = "default_race_grace")]
    pub race_grace_secs: u64,
    /// Recompute claim lifetime in seconds (default: 15).
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_secs: u64,
    /// Bounded wait for claim losers in milliseconds (default: 6000).
    #[serde(default = "default_claim_wait")]
    pub claim_wait_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            race_grace_secs: default_race_grace(),
            claim_ttl_secs: default_claim_ttl(),
            claim_wait_ms: default_claim_wait(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_race_grace() -> u64 {
    10
}

fn default_claim_ttl() -> u64 {
    15
}

fn default_claim_wait() -> u64 {
    6_000
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerSettings {
    /// Cool-down in seconds after a trip (default: 30).
    #[serde(default = "default_cool_down")]
    pub cool_down_secs: u64,
    /// Store key of the provider-wide breaker.
    #[serde(default = "default_breaker_key")]
    pub key: String,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            cool_down_secs: default_cool_down(),
            key: default_breaker_key(),
        }
    }
}

fn default_cool_down() -> u64 {
    30
}

fn default_breaker_key() -> String {
    DEFAULT_BREAKER_KEY.to_string()
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PricingError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PricingError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            PricingError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path; `None` means use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(PricingError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pricing-shield").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/pricing-shield/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(RATE_API_URL_ENV).filter(|url| !url.is_empty()) {
            self.provider.base_url = url;
        }
        if let Some(token) = lookup(RATE_API_TOKEN_ENV).filter(|token| !token.is_empty()) {
            self.provider.token = Some(token);
        }
    }

    /// Runtime configuration for [`PricingService`].
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig::new()
            .cache_ttl(Duration::from_secs(self.cache.ttl_secs))
            .race_grace(Duration::from_secs(self.cache.race_grace_secs))
            .breaker_cool_down(Duration::from_secs(self.breaker.cool_down_secs))
            .breaker_key(self.breaker.key.clone())
            .provider_timeout(Duration::from_secs(self.provider.timeout_secs))
            .connect_timeout(Duration::from_secs(self.provider.connect_timeout_secs))
            .cache(
                CacheConfig::new()
                    .claim_ttl(Duration::from_secs(self.cache.claim_ttl_secs))
                    .claim_wait(Duration::from_millis(self.cache.claim_wait_ms)),
            )
    }

    /// Build a service talking to the configured HTTP provider.
    pub fn build_service(&self) -> Result<PricingService> {
        let mut builder = PricingService::builder()
            .rate_api(self.provider.base_url.clone())
            .config(self.pricing_config());
        if let Some(token) = &self.provider.token {
            builder = builder.rate_api_token(token.clone());
        }
        builder.build()
    }
}
