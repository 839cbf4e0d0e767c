//! Engine configuration

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Largest age in seconds that chrono can hold as a millisecond duration
const MAX_AGE_SECS: i64 = i64::MAX / 1000;

/// Freshness windows and size limits for the cache stores and the queue.
///
/// Durations are stored as whole seconds so the config can be loaded from a
/// JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum age of the cart snapshot
    pub cart_max_age_secs: i64,
    /// Maximum age of the cached profile
    pub profile_max_age_secs: i64,
    /// Maximum age of a cached product
    pub product_max_age_secs: i64,
    /// Maximum number of cached products (most recently touched kept)
    pub max_cached_products: usize,
    /// Retry ceiling used when an operation is enqueued without one
    pub default_max_retries: u32,
    /// Maximum number of abandoned operations kept in the dead-letter log
    pub max_dead_letters: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cart_max_age_secs: 30 * 24 * 60 * 60,    // 30 days
            profile_max_age_secs: 24 * 60 * 60,      // 24 hours
            product_max_age_secs: 7 * 24 * 60 * 60,  // 7 days
            max_cached_products: 50,
            default_max_retries: 3,
            max_dead_letters: 100,
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every maximum age is positive and representable as a
    /// [`Duration`].
    pub fn validate(&self) -> Result<(), SyncError> {
        let ages = [
            ("cart_max_age_secs", self.cart_max_age_secs),
            ("profile_max_age_secs", self.profile_max_age_secs),
            ("product_max_age_secs", self.product_max_age_secs),
        ];
        for (field, secs) in ages {
            if secs <= 0 || secs > MAX_AGE_SECS {
                return Err(SyncError::InvalidOperation(format!(
                    "{} must be between 1 and {}, got {}",
                    field, MAX_AGE_SECS, secs
                )));
            }
        }
        Ok(())
    }

    pub fn cart_max_age(&self) -> Duration {
        Duration::seconds(self.cart_max_age_secs)
    }

    pub fn profile_max_age(&self) -> Duration {
        Duration::seconds(self.profile_max_age_secs)
    }

    pub fn product_max_age(&self) -> Duration {
        Duration::seconds(self.product_max_age_secs)
    }

    pub fn with_cart_max_age(mut self, max_age: Duration) -> Self {
        self.cart_max_age_secs = max_age.num_seconds();
        self
    }

    pub fn with_profile_max_age(mut self, max_age: Duration) -> Self {
        self.profile_max_age_secs = max_age.num_seconds();
        self
    }

    pub fn with_product_max_age(mut self, max_age: Duration) -> Self {
        self.product_max_age_secs = max_age.num_seconds();
        self
    }

    pub fn with_max_cached_products(mut self, max: usize) -> Self {
        self.max_cached_products = max;
        self
    }

    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn with_max_dead_letters(mut self, max: usize) -> Self {
        self.max_dead_letters = max;
        self
    }
}
