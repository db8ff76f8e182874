//! Rate results and the provider's wire schema.
//!
//! The request/response shapes are a contract with the external pricing
//! provider:
//!
//! ```text
//! POST /pricing  {"attributes": [{"period", "hotel", "room"}]}
//!           ->   {"rates": [{"period", "hotel", "room", "rate"}]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::RateQuery;

/// Where a returned rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// A fresh cache entry.
    Cache,
    /// An expired entry served while another caller recomputes it.
    Stale,
    /// A provider call made for this lookup.
    Provider,
}

/// The price for a [`RateQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Rate as reported by the provider.
    pub value: String,
    pub source: RateSource,
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Request body sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequest {
    pub attributes: Vec<RateAttributes>,
}

/// One requested (period, hotel, room) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateAttributes {
    pub period: String,
    pub hotel: String,
    pub room: String,
}

impl From<&RateQuery> for RateRequest {
    fn from(query: &RateQuery) -> Self {
        Self {
            attributes: vec![RateAttributes {
                period: query.period.clone(),
                hotel: query.hotel.clone(),
                room: query.room.clone(),
            }],
        }
    }
}

/// Response body returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateResponse {
    pub rates: Vec<RateEntry>,
}

/// One rate entry in a provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEntry {
    pub period: String,
    pub hotel: String,
    pub room: String,
    /// Usually a string; numbers are tolerated.
    #[serde(default)]
    pub rate: Option<serde_json::Value>,
}

impl RateEntry {
    fn matches(&self, query: &RateQuery) -> bool {
        self.period == query.period && self.hotel == query.hotel && self.room == query.room
    }

    /// The rate rendered as a string, or `None` when the entry carries no
    /// usable rate.
    pub fn rate_value(&self) -> Option<String> {
        match self.rate.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl RateResponse {
    /// Parse a provider response body.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// First entry whose (period, hotel, room) exactly matches `query`.
    pub fn find(&self, query: &RateQuery) -> Option<&RateEntry> {
        self.rates.iter().find(|entry| entry.matches(query))
    }
}
