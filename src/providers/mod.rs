//! Fetch functions: the calls that actually reach the pricing provider.
//!
//! The orchestrator only sees the [`RateProvider`] trait, so tests and
//! alternative transports substitute their own implementation.

mod http;
pub mod traits;

pub use http::{DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, HttpRateProvider};
pub use traits::{ProviderResponse, RateProvider};
