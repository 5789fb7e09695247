//! Storefront FX Service Binary
//!
//! Resolves the storefront exchange rate once, then keeps the admin quota
//! display refreshed until shutdown.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_common::QuotaLevel;
use storefront_fx::{
    AdminSession, BackendClient, ExchangeRateApiProvider, ExchangeRateResolver, FileStore,
    FxConfig, QuotaTracker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = FxConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting storefront FX resolver");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .use_rustls_tls()
        .build()?;

    let backend = Arc::new(BackendClient::new(
        http.clone(),
        config.backend.base_url.clone(),
        config.backend.admin_token.clone(),
    ));
    let provider = Arc::new(ExchangeRateApiProvider::new(
        http,
        config.rate_api.api_url.clone(),
        config.rate_api.api_key.clone(),
    ));
    let store = Arc::new(FileStore::open(&config.cache_dir)?);
    let session = AdminSession::new(
        config.backend.session_path.clone(),
        config.backend.admin_token.clone(),
    );

    let resolver = Arc::new(ExchangeRateResolver::new(
        provider,
        backend.clone(),
        QuotaTracker::new(backend, session),
        store,
        config.resolver_config(),
    ));

    let resolution = resolver.resolve_rate().await;
    let level = resolver.quota_level();

    info!(
        pair = %resolver.pair(),
        rate = %resolution.rate,
        source = %resolution.source,
        quota_count = resolution.quota.count,
        quota_month = %resolution.quota.month,
        quota_limit = config.quota_limit,
        quota_level = %level,
        "Exchange rate ready"
    );

    if level >= QuotaLevel::Warning {
        warn!(
            remaining = resolution.quota.remaining(config.quota_limit),
            "Exchange rate API quota running low"
        );
    }

    println!("{}", serde_json::to_string_pretty(&resolution)?);

    let refresher = resolver.spawn_quota_refresh(config.quota_refresh_interval);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    refresher.shutdown().await;

    info!("Storefront FX resolver shutdown complete");
    Ok(())
}
