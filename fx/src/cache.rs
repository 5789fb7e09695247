//! Persistent rate cache with TTL support.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_common::{constants, now, Timestamp};
use tracing::{debug, warn};

use crate::error::FxResult;
use crate::storage::SharedStore;

/// Storage key holding the serialized cache entry.
pub const CACHE_KEY: &str = "exchange_rate_cache";

/// Cached rate entry, stored as `{rate, timestamp, expiresAt}` with
/// millisecond epoch timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRate {
    pub rate: Decimal,
    /// When the rate was fetched.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: Timestamp,
}

impl CachedRate {
    /// Create an entry fetched at `at`, valid for `ttl`. An expiry past the
    /// representable range is clamped to the latest timestamp.
    pub fn new(rate: Decimal, at: Timestamp, ttl: Duration) -> Self {
        Self {
            rate,
            timestamp: at,
            expires_at: at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Check if the entry is still valid at `at`.
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        at < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now())
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a stored rate stays valid.
    pub ttl: Duration,
    /// Storage key.
    pub key: String,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::rate_cache_ttl(),
            key: CACHE_KEY.to_string(),
        }
    }
}

/// Single-entry rate cache over a key/value store.
///
/// Storage failures never propagate: reads degrade to a miss and writes are
/// dropped, both with a warning.
pub struct RateCache {
    store: SharedStore,
    config: RateCacheConfig,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(store: SharedStore, config: RateCacheConfig) -> Self {
        Self { store, config }
    }

    /// Get the cached rate if it has not expired.
    pub fn get(&self) -> Option<CachedRate> {
        let entry = self.last()?;
        if entry.is_valid() {
            debug!(rate = %entry.rate, expires_at = %entry.expires_at, "Cache hit");
            Some(entry)
        } else {
            debug!(expires_at = %entry.expires_at, "Cache entry expired");
            None
        }
    }

    /// Get the stored entry regardless of expiry.
    pub fn last(&self) -> Option<CachedRate> {
        match self.read() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, key = %self.config.key, "Failed to read cache from storage");
                None
            }
        }
    }

    /// Store `rate` as fetched at `fetched_at`.
    pub fn store(&self, rate: Decimal, fetched_at: Timestamp) -> CachedRate {
        let entry = CachedRate::new(rate, fetched_at, self.config.ttl);
        if let Err(e) = self.write(&entry) {
            warn!(error = %e, key = %self.config.key, "Failed to save cache to storage");
        }
        entry
    }

    fn read(&self) -> FxResult<Option<CachedRate>> {
        match self.store.get(&self.config.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn write(&self, entry: &CachedRate) -> FxResult<()> {
        let raw = serde_json::to_string(entry)?;
        self.store.set(&self.config.key, &raw)
    }
}
