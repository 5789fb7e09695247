//! Exchange rate resolver.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use storefront_common::{
    constants, now, CurrencyPair, DurationExt, Money, QuotaLevel, QuotaUsage, RateSource,
    Timestamp,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{RateCache, RateCacheConfig};
use crate::error::FxResult;
use crate::provider::RateProvider;
use crate::quota::{AdminSession, QuotaTracker};
use crate::settings::{manual_rate, SettingsStore};
use crate::storage::SharedStore;

/// Configuration for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Pair being resolved.
    pub pair: CurrencyPair,
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Rate used when nothing else is available.
    pub fallback_rate: Decimal,
    /// Monthly plan limit, for quota severity.
    pub quota_limit: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pair: CurrencyPair::usd_zmw(),
            cache: RateCacheConfig::default(),
            fallback_rate: constants::fallback_rate(),
            quota_limit: constants::QUOTA_LIMIT,
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub rate: Decimal,
    pub source: RateSource,
    /// When the returned rate was produced.
    pub updated_at: Timestamp,
    /// Remote failure message, when the rate is a fallback.
    pub error: Option<String>,
    pub quota: QuotaUsage,
}

/// Latest resolver state, as shown to the storefront and admin UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateState {
    pub rate: Decimal,
    pub source: Option<RateSource>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<Timestamp>,
    pub quota: QuotaUsage,
}

/// Resolves the USD to local currency rate.
///
/// Order: manual override, unexpired cache, remote API, then the last cached
/// value or the fallback constant. Every failure degrades to the next step;
/// `resolve_rate` always produces a usable rate.
pub struct ExchangeRateResolver {
    provider: Arc<dyn RateProvider>,
    settings: Arc<dyn SettingsStore>,
    cache: RateCache,
    quota: QuotaTracker,
    config: ResolverConfig,
    state: RwLock<RateState>,
}

impl ExchangeRateResolver {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        settings: Arc<dyn SettingsStore>,
        quota: QuotaTracker,
        store: SharedStore,
        config: ResolverConfig,
    ) -> Self {
        let state = RateState {
            rate: config.fallback_rate,
            source: None,
            loading: true,
            error: None,
            last_updated: None,
            quota: QuotaUsage {
                count: 0,
                month: String::new(),
            },
        };
        Self {
            provider,
            settings,
            cache: RateCache::with_config(store, config.cache.clone()),
            quota,
            config,
            state: RwLock::new(state),
        }
    }

    /// Resolve the current rate and update the shared state.
    #[instrument(skip(self), fields(pair = %self.config.pair))]
    pub async fn resolve_rate(&self) -> Resolution {
        {
            let mut state = self.state.write();
            state.loading = true;
            state.error = None;
        }

        let resolution = self.resolve_inner().await;

        {
            let mut state = self.state.write();
            state.rate = resolution.rate;
            state.source = Some(resolution.source);
            state.loading = false;
            state.error = resolution.error.clone();
            state.last_updated = Some(resolution.updated_at);
            state.quota = resolution.quota.clone();
        }

        info!(
            rate = %resolution.rate,
            source = %resolution.source,
            quota_count = resolution.quota.count,
            "Exchange rate resolved"
        );

        resolution
    }

    async fn resolve_inner(&self) -> Resolution {
        if let Some(rate) = manual_rate(self.settings.as_ref()).await {
            debug!(rate = %rate, "Using manual exchange rate, skipping external API");
            return Resolution {
                rate,
                source: RateSource::Manual,
                updated_at: now(),
                error: None,
                quota: self.quota.get_quota().await,
            };
        }

        if let Some(cached) = self.cache.get() {
            debug!(rate = %cached.rate, "Using cached exchange rate, skipping external API");
            return Resolution {
                rate: cached.rate,
                source: RateSource::Cache,
                updated_at: cached.timestamp,
                error: None,
                quota: self.quota.get_quota().await,
            };
        }

        let fetched = self.provider.fetch_rate(&self.config.pair).await;

        // The call was made whether or not it succeeded.
        let quota = self.quota.increment_quota().await;

        match fetched {
            Ok(remote) => {
                debug!(source = %remote.source, rate = %remote.rate, "Fetched exchange rate");
                self.cache.store(remote.rate, remote.fetched_at);
                Resolution {
                    rate: remote.rate,
                    source: RateSource::Remote,
                    updated_at: remote.fetched_at,
                    error: None,
                    quota,
                }
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Failed to fetch exchange rate");
                let (rate, source, updated_at) = match self.cache.last() {
                    Some(stale) => (stale.rate, RateSource::StaleCache, stale.timestamp),
                    None => (self.config.fallback_rate, RateSource::Fallback, now()),
                };
                Resolution {
                    rate,
                    source,
                    updated_at,
                    error: Some(e.to_string()),
                    quota,
                }
            }
        }
    }

    /// Re-read quota usage into the shared state without resolving.
    pub async fn refresh_quota(&self) -> QuotaUsage {
        let quota = self.quota.get_quota().await;
        self.state.write().quota = quota.clone();
        quota
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> RateState {
        self.state.read().clone()
    }

    /// Severity of the current quota usage.
    pub fn quota_level(&self) -> QuotaLevel {
        self.state.read().quota.level(self.config.quota_limit)
    }

    /// Convert `amount` into the quote currency at the current rate.
    pub fn convert(&self, amount: &Money) -> FxResult<Money> {
        let rate = self.state.read().rate;
        Ok(amount.convert(&self.config.pair, rate)?)
    }

    /// Replace the session used for quota gating.
    pub fn set_session(&self, session: AdminSession) {
        self.quota.set_session(session);
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.config.pair
    }

    /// Refresh the quota display every `interval` until the handle is shut down.
    /// A zero interval is replaced by the default refresh interval.
    pub fn spawn_quota_refresh(self: &Arc<Self>, interval: Duration) -> QuotaRefreshHandle {
        let interval = if interval.is_zero() {
            let default = constants::quota_refresh_interval().as_std();
            warn!(default_secs = default.as_secs(), "Zero quota refresh interval, using default");
            default
        } else {
            interval
        };
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let resolver = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the initial read happens at resolve time.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let quota = resolver.refresh_quota().await;
                        debug!(count = quota.count, month = %quota.month, "Quota refreshed");
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        QuotaRefreshHandle { shutdown_tx, task }
    }
}

/// Stops a background quota refresher.
pub struct QuotaRefreshHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl QuotaRefreshHandle {
    /// Signal the refresher to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Quota refresher ended abnormally");
        }
    }
}
