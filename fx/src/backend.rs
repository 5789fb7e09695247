//! HTTP client for the storefront backend's admin settings and quota endpoints.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use storefront_common::QuotaUsage;
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::quota::QuotaStore;
use crate::settings::SettingsStore;

/// Responses come either bare or wrapped as `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

/// Backend API client.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    admin_token: Option<String>,
}

impl BackendClient {
    pub fn new(client: Client, base_url: impl Into<String>, admin_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_token: admin_token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> FxResult<RequestBuilder> {
        let req = req.header(ACCEPT, HeaderValue::from_static("application/json"));
        match &self.admin_token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| FxError::Configuration(format!("invalid admin token: {e}")))?;
                Ok(req.header(AUTHORIZATION, value))
            }
            None => Ok(req),
        }
    }

    async fn read_json<T: DeserializeOwned>(res: Response) -> FxResult<T> {
        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(FxError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: Envelope<T> = res
            .json()
            .await
            .map_err(|e| FxError::InvalidResponse(e.to_string()))?;
        Ok(envelope.into_inner())
    }
}

#[async_trait]
impl SettingsStore for BackendClient {
    async fn fetch_settings(&self, category: &str) -> FxResult<Value> {
        let url = self.url(&format!("/admin/settings/{category}"));
        debug!(url = %url, "Fetching settings");
        let res = self.authorize(self.client.get(url))?.send().await?;
        Self::read_json(res).await
    }
}

#[async_trait]
impl QuotaStore for BackendClient {
    async fn fetch_quota(&self) -> FxResult<QuotaUsage> {
        let url = self.url("/admin/exchange-rate/quota");
        let res = self.authorize(self.client.get(url))?.send().await?;
        Self::read_json(res).await
    }

    async fn increment_quota(&self) -> FxResult<QuotaUsage> {
        let url = self.url("/admin/exchange-rate/quota/increment");
        let res = self.authorize(self.client.post(url))?.send().await?;
        let quota: QuotaUsage = Self::read_json(res).await?;
        debug!(count = quota.count, month = %quota.month, "Quota incremented");
        Ok(quota)
    }
}
