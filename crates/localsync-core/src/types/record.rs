//! Timestamped cache wrapper

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An entity together with the time it was written to the cache.
///
/// The entity's own fields are flattened next to `cachedAt`, so a cached
/// profile reads as the profile plus one extra field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord<T> {
    #[serde(flatten)]
    pub value: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CacheRecord<T> {
    pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
        Self { value, cached_at }
    }

    /// Whether this record is older than `max_age` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        is_expired(self.cached_at, now, max_age)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Freshness check shared by every cache store.
///
/// A record exactly `max_age` old is still fresh. Timestamps in the future
/// (clock moved backwards) count as fresh.
pub fn is_expired(cached_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(cached_at) > max_age
}
