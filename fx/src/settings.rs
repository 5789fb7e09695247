//! Admin-configured manual exchange rate.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_common::rate_from_json;
use tracing::{debug, warn};

use crate::error::FxResult;

/// Settings category holding the manual rate.
pub const GENERAL_CATEGORY: &str = "general";

/// Settings key for the manual rate (local currency per USD).
pub const MANUAL_RATE_KEY: &str = "manualExchangeRateZmwPerUsd";

/// Source of admin settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch all settings in `category` as a JSON object.
    async fn fetch_settings(&self, category: &str) -> FxResult<Value>;
}

/// Extract the manual rate from a settings payload.
///
/// Accepts the bare settings object or one wrapped as `{ "data": { ... } }`.
/// Missing, null, empty, non-numeric, and non-positive values all mean
/// "not configured".
pub fn parse_manual_rate(settings: &Value) -> Option<Decimal> {
    let settings = match settings.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => settings,
    };
    let raw = settings.get(MANUAL_RATE_KEY)?;
    let parsed = rate_from_json(raw);
    if parsed.is_none() && !is_blank(raw) {
        debug!(raw = %raw, "Manual exchange rate invalid, ignoring");
    }
    parsed
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Read the manual rate, treating any store failure as "not configured".
pub async fn manual_rate(store: &dyn SettingsStore) -> Option<Decimal> {
    match store.fetch_settings(GENERAL_CATEGORY).await {
        Ok(settings) => parse_manual_rate(&settings),
        Err(e) => {
            warn!(error = %e, "Failed to load manual exchange rate setting");
            None
        }
    }
}

/// In-memory settings, one JSON object per category.
#[derive(Debug, Default)]
pub struct StaticSettings {
    categories: DashMap<String, Value>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with the manual rate set to `rate` in the general category.
    pub fn with_manual_rate(rate: Value) -> Self {
        let settings = Self::new();
        settings.set(GENERAL_CATEGORY, serde_json::json!({ MANUAL_RATE_KEY: rate }));
        settings
    }

    /// Replace the settings of a category.
    pub fn set(&self, category: &str, settings: Value) {
        self.categories.insert(category.to_string(), settings);
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn fetch_settings(&self, category: &str) -> FxResult<Value> {
        Ok(self
            .categories
            .get(category)
            .map(|v| v.clone())
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    struct FailingSettings;

    #[async_trait]
    impl SettingsStore for FailingSettings {
        async fn fetch_settings(&self, _category: &str) -> FxResult<Value> {
            Err(FxError::Upstream {
                status: 502,
                message: "Bad Gateway".into(),
            })
        }
    }

    #[test]
    fn test_parse_number_and_string() {
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: 20 })), Some(dec!(20)));
        assert_eq!(
            parse_manual_rate(&json!({ MANUAL_RATE_KEY: "19.75" })),
            Some(dec!(19.75))
        );
    }

    #[test]
    fn test_parse_leading_number() {
        assert_eq!(
            parse_manual_rate(&json!({ MANUAL_RATE_KEY: "20 ZMW" })),
            Some(dec!(20))
        );
        assert_eq!(
            parse_manual_rate(&json!({ MANUAL_RATE_KEY: "20abc" })),
            Some(dec!(20))
        );
        assert!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: "1e-30" })).is_some());
    }

    #[test]
    fn test_parse_wrapped_payload() {
        let payload = json!({ "data": { MANUAL_RATE_KEY: "21" } });
        assert_eq!(parse_manual_rate(&payload), Some(dec!(21)));
    }

    #[test]
    fn test_not_configured() {
        assert_eq!(parse_manual_rate(&json!({})), None);
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: null })), None);
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: "" })), None);
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: "abc" })), None);
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: 0 })), None);
        assert_eq!(parse_manual_rate(&json!({ MANUAL_RATE_KEY: -5 })), None);
        assert_eq!(parse_manual_rate(&json!(null)), None);
    }

    #[tokio::test]
    async fn test_manual_rate_store_failure() {
        assert_eq!(manual_rate(&FailingSettings).await, None);
    }

    #[test]
    fn test_static_settings() {
        let store = StaticSettings::with_manual_rate(json!(20));
        assert_eq!(tokio_test::block_on(manual_rate(&store)), Some(dec!(20)));

        let empty = StaticSettings::new();
        assert_eq!(tokio_test::block_on(manual_rate(&empty)), None);
    }

    proptest! {
        #[test]
        fn positive_rates_round_trip(cents in 1i64..10_000_000) {
            let rate = Decimal::new(cents, 2);
            let payload = json!({ MANUAL_RATE_KEY: rate.to_string() });
            prop_assert_eq!(parse_manual_rate(&payload), Some(rate));
        }
    }
}
