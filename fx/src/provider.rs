//! Remote rate providers.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use storefront_common::{now, rate_from_json, CurrencyPair, Timestamp};
use tracing::debug;

use crate::error::{FxError, FxResult};

/// A rate returned by a remote provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRate {
    pub pair: CurrencyPair,
    /// Units of quote currency per unit of base currency.
    pub rate: Decimal,
    pub fetched_at: Timestamp,
    pub source: String,
}

/// Trait for FX rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the current rate for a currency pair.
    async fn fetch_rate(&self, pair: &CurrencyPair) -> FxResult<RemoteRate>;
}

/// Body of `GET /v6/{key}/latest/{base}`.
#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

/// Client for the ExchangeRate-API `latest` endpoint.
pub struct ExchangeRateApiProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ExchangeRateApiProvider {
    /// Create a provider. `api_url` is the versioned API root, e.g.
    /// `https://v6.exchangerate-api.com/v6`.
    pub fn new(client: Client, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn latest_url(&self, pair: &CurrencyPair) -> String {
        format!("{}/{}/latest/{}", self.api_url, self.api_key, pair.base.code())
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    async fn fetch_rate(&self, pair: &CurrencyPair) -> FxResult<RemoteRate> {
        let res = self
            .client
            .get(self.latest_url(pair))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FxError::Upstream {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body: LatestResponse = res
            .json()
            .await
            .map_err(|e| FxError::InvalidResponse(e.to_string()))?;

        if body.result != "success" {
            let reason = body.error_type.unwrap_or_else(|| body.result.clone());
            return Err(FxError::InvalidResponse(format!("result was {reason}")));
        }

        let rate = body
            .rates
            .get(pair.quote.code())
            .and_then(rate_from_json)
            .ok_or_else(|| {
                FxError::InvalidResponse(format!("missing or invalid rate for {}", pair.quote))
            })?;

        debug!(provider = self.name(), pair = %pair, rate = %rate, "Fetched remote rate");

        Ok(RemoteRate {
            pair: pair.clone(),
            rate,
            fetched_at: now(),
            source: self.name().to_string(),
        })
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rate: parking_lot::Mutex<Option<Decimal>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a provider that fails until a rate is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rate: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the rate returned, or `None` to fail.
    pub fn set_rate(&self, rate: Option<Decimal>) {
        *self.rate.lock() = rate;
    }

    /// Number of fetches made.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rate(&self, pair: &CurrencyPair) -> FxResult<RemoteRate> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let rate = (*self.rate.lock()).ok_or_else(|| FxError::Upstream {
            status: 503,
            message: "Service Unavailable".to_string(),
        })?;
        Ok(RemoteRate {
            pair: pair.clone(),
            rate,
            fetched_at: now(),
            source: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn provider(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(Client::new(), server.url("/v6"), "test-key")
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v6/test-key/latest/USD");
                then.status(200).json_body(json!({
                    "result": "success",
                    "base_code": "USD",
                    "rates": { "USD": 1, "ZMW": 18.5 }
                }));
            })
            .await;

        let rate = provider(&server)
            .fetch_rate(&CurrencyPair::usd_zmw())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(rate.rate, dec!(18.5));
        assert_eq!(rate.source, "exchangerate-api");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v6/test-key/latest/USD");
                then.status(500);
            })
            .await;

        let result = provider(&server).fetch_rate(&CurrencyPair::usd_zmw()).await;
        assert!(matches!(result, Err(FxError::Upstream { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_error_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v6/test-key/latest/USD");
                then.status(200)
                    .json_body(json!({ "result": "error", "error-type": "invalid-key" }));
            })
            .await;

        let err = provider(&server)
            .fetch_rate(&CurrencyPair::usd_zmw())
            .await
            .unwrap_err();
        assert!(matches!(err, FxError::InvalidResponse(ref m) if m.contains("invalid-key")));
    }

    #[tokio::test]
    async fn test_missing_quote_rate() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v6/test-key/latest/USD");
                then.status(200)
                    .json_body(json!({ "result": "success", "rates": { "EUR": 0.92 } }));
            })
            .await;

        let result = provider(&server).fetch_rate(&CurrencyPair::usd_zmw()).await;
        assert!(matches!(result, Err(FxError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v6/test-key/latest/USD");
                then.status(200)
                    .json_body(json!({ "result": "success", "rates": { "ZMW": 0 } }));
            })
            .await;

        let result = provider(&server).fetch_rate(&CurrencyPair::usd_zmw()).await;
        assert!(matches!(result, Err(FxError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockRateProvider::new("test");
        assert!(provider.fetch_rate(&CurrencyPair::usd_zmw()).await.is_err());

        provider.set_rate(Some(dec!(18.2)));
        let rate = provider.fetch_rate(&CurrencyPair::usd_zmw()).await.unwrap();

        assert_eq!(rate.rate, dec!(18.2));
        assert_eq!(provider.calls(), 2);
    }
}
