//! Public types for the pricing shield API.

mod query;
mod rate;

pub use query::{CACHE_KEY_PREFIX, CacheKey, RateQuery};
pub use rate::{Rate, RateAttributes, RateEntry, RateRequest, RateResponse, RateSource};
