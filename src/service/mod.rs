//! Rate fetch orchestration: the crate's public entry point.

mod builder;
mod config;
mod pricing;

pub use builder::PricingServiceBuilder;
pub use config::{DEFAULT_BREAKER_KEY, PricingConfig};
pub use pricing::PricingService;
