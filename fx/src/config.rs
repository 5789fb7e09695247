//! Resolver configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use storefront_common::{constants, Currency, CurrencyPair, DurationExt};

use crate::cache::{RateCacheConfig, CACHE_KEY};
use crate::engine::ResolverConfig;

/// Longest accepted rate cache TTL (one year).
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Remote exchange-rate API configuration.
#[derive(Debug, Clone)]
pub struct RateApiConfig {
    /// Versioned API root.
    pub api_url: String,
    pub api_key: String,
    pub base: Currency,
    pub quote: Currency,
}

impl Default for RateApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: String::new(),
            base: Currency::usd(),
            quote: Currency::zmw(),
        }
    }
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Admin JWT used for settings and quota calls.
    pub admin_token: Option<String>,
    /// Route the session is on; quota is only tracked on admin routes.
    pub session_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            admin_token: None,
            session_path: "/".to_string(),
        }
    }
}

/// Main FX configuration.
#[derive(Debug, Clone)]
pub struct FxConfig {
    pub rate_api: RateApiConfig,
    pub backend: BackendConfig,
    /// Directory for the persistent rate cache.
    pub cache_dir: PathBuf,
    /// Rate cache TTL.
    pub cache_ttl: Duration,
    /// Quota display refresh interval.
    pub quota_refresh_interval: Duration,
    /// Monthly request allowance.
    pub quota_limit: u64,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            rate_api: RateApiConfig::default(),
            backend: BackendConfig::default(),
            cache_dir: PathBuf::from(".storefront-fx"),
            cache_ttl: constants::rate_cache_ttl().as_std(),
            quota_refresh_interval: constants::quota_refresh_interval().as_std(),
            quota_limit: constants::QUOTA_LIMIT,
            http_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("EXCHANGE_RATE_API_URL") {
            config.rate_api.api_url = url;
        }

        if let Some(key) = lookup("EXCHANGE_RATE_API_KEY") {
            config.rate_api.api_key = key;
        }

        if let Some(base) = lookup("EXCHANGE_RATE_BASE") {
            config.rate_api.base = Currency::new(base);
        }

        if let Some(quote) = lookup("EXCHANGE_RATE_QUOTE") {
            config.rate_api.quote = Currency::new(quote);
        }

        if let Some(url) = lookup("BACKEND_API_URL") {
            config.backend.base_url = url;
        }

        if let Some(token) = lookup("ADMIN_JWT") {
            config.backend.admin_token = Some(token);
        }

        if let Some(path) = lookup("ADMIN_PATH") {
            config.backend.session_path = path;
        }

        if let Some(dir) = lookup("RATE_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }

        if let Some(secs) = lookup("RATE_CACHE_TTL_SECS").and_then(|s| s.parse().ok()) {
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = lookup("QUOTA_REFRESH_SECS").and_then(|s| s.parse().ok()) {
            config.quota_refresh_interval = Duration::from_secs(secs);
        }

        if let Some(limit) = lookup("QUOTA_LIMIT").and_then(|s| s.parse().ok()) {
            config.quota_limit = limit;
        }

        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_api.api_url.is_empty() {
            return Err("Exchange rate API URL cannot be empty".to_string());
        }

        if self.rate_api.api_key.is_empty() {
            return Err("Exchange rate API key cannot be empty".to_string());
        }

        if self.rate_api.base == self.rate_api.quote {
            return Err("Base and quote currency must differ".to_string());
        }

        if self.backend.base_url.is_empty() {
            return Err("Backend URL cannot be empty".to_string());
        }

        if self.cache_ttl.is_zero() {
            return Err("Cache TTL cannot be zero".to_string());
        }

        if self.cache_ttl > MAX_CACHE_TTL {
            return Err(format!(
                "Cache TTL cannot exceed {} seconds",
                MAX_CACHE_TTL.as_secs()
            ));
        }

        if self.quota_refresh_interval.is_zero() {
            return Err("Quota refresh interval cannot be zero".to_string());
        }

        if self.quota_limit == 0 {
            return Err("Quota limit cannot be zero".to_string());
        }

        Ok(())
    }

    /// Currency pair being resolved.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.rate_api.base.clone(), self.rate_api.quote.clone())
    }

    /// Resolver settings derived from this configuration.
    pub fn resolver_config(&self) -> ResolverConfig {
        let ttl = ChronoDuration::from_std(self.cache_ttl)
            .unwrap_or_else(|_| constants::rate_cache_ttl());
        ResolverConfig {
            pair: self.pair(),
            cache: RateCacheConfig {
                ttl,
                key: CACHE_KEY.to_string(),
            },
            quota_limit: self.quota_limit,
            ..Default::default()
        }
    }
}
