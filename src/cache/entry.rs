//! Persisted cache entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::unix_millis;

/// A cached value with its write time and freshness window.
///
/// Only ever created from a successful computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    /// Write time, Unix milliseconds.
    pub stored_at_ms: u64,
    /// Freshness window in milliseconds.
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Stamp a freshly computed value with the current time.
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            stored_at_ms: unix_millis(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// Whether the entry is fresh at `now_ms` (`now - stored_at <= ttl`).
    pub fn is_fresh_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at_ms) <= self.ttl_ms
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(unix_millis())
    }

    pub(crate) fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub(crate) fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
