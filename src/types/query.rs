//! Rate queries and the cache keys derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PricingError, Result};

/// Namespace prefix of every rate cache key.
pub const CACHE_KEY_PREFIX: &str = "pricing/v1";

/// Characters with meaning inside store keys: the segment separator and the
/// claim-key marker. Identifiers must not contain them.
const RESERVED_CHARS: [char; 2] = ['/', '#'];

/// A lookup of the price for one (period, hotel, room) tuple.
///
/// Identity is structural equality of the three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateQuery {
    pub period: String,
    pub hotel: String,
    pub room: String,
}

impl RateQuery {
    pub fn new(
        period: impl Into<String>,
        hotel: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            period: period.into(),
            hotel: hotel.into(),
            room: room.into(),
        }
    }

    /// Check the identifier constraints the cache key relies on.
    ///
    /// Every field must be non-empty and free of `/` and `#`, which keeps
    /// distinct queries from mapping onto the same key or onto a claim key.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("period", &self.period),
            ("hotel", &self.hotel),
            ("room", &self.room),
        ] {
            if value.trim().is_empty() {
                return Err(PricingError::InvalidQuery(format!("{name} must not be empty")));
            }
            if let Some(c) = value.chars().find(|c| RESERVED_CHARS.contains(c)) {
                return Err(PricingError::InvalidQuery(format!(
                    "{name} must not contain '{c}': {value:?}"
                )));
            }
        }
        Ok(())
    }

    /// Derive the cache key: `pricing/v1/{hotel}/{room}/{period}`.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!(
            "{CACHE_KEY_PREFIX}/{}/{}/{}",
            self.hotel, self.room, self.period
        ))
    }
}

/// Deterministic cache key for a [`RateQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
