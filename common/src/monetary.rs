//! Monetary types for the storefront FX resolver.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MonetaryError, Result};

/// A monetary amount with currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount value (high precision decimal).
    pub value: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money instance.
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Round to the currency's standard decimal places.
    pub fn round(&self) -> Self {
        let places = self.currency.decimal_places();
        Self {
            value: self.value.round_dp(places),
            currency: self.currency.clone(),
        }
    }

    /// Convert into the quote currency of `pair` at `rate` (quote units per base unit).
    pub fn convert(&self, pair: &CurrencyPair, rate: Decimal) -> Result<Money> {
        if self.currency != pair.base {
            return Err(MonetaryError::CurrencyMismatch {
                expected: pair.base.clone(),
                actual: self.currency.clone(),
            });
        }
        if rate <= Decimal::ZERO {
            return Err(MonetaryError::InvalidRate(rate.to_string()));
        }
        Ok(Money::new(self.value * rate, pair.quote.clone()).round())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Get the standard decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" => 0,
            "BHD" | "KWD" | "OMR" => 3,
            _ => 2,
        }
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    /// Zambian kwacha, the storefront's display currency.
    pub fn zmw() -> Self {
        Self::new("ZMW")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A currency pair quoted as units of `quote` per one unit of `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The storefront default: USD priced in ZMW.
    pub fn usd_zmw() -> Self {
        Self::new(Currency::usd(), Currency::zmw())
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::usd_zmw()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Administrator-configured override.
    Manual,
    /// Unexpired local cache entry.
    Cache,
    /// Fresh value from the remote API.
    Remote,
    /// Expired cache entry used after a remote failure.
    StaleCache,
    /// Hard-coded constant.
    Fallback,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RateSource::Manual => "manual",
            RateSource::Cache => "cache",
            RateSource::Remote => "remote",
            RateSource::StaleCache => "stale_cache",
            RateSource::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Parse a rate from the leading number in `raw`.
///
/// Leading whitespace is skipped and anything after the longest numeric
/// prefix is ignored, so `"20 ZMW"` reads as 20. Returns `None` when there is
/// no numeric prefix, or when the value is not a finite positive number.
/// Positive values below the smallest representable decimal are clamped up to
/// it; values too large for a decimal are rejected.
pub fn parse_positive_rate(raw: &str) -> Option<Decimal> {
    let prefix = numeric_prefix(raw.trim_start());
    if prefix.is_empty() {
        return None;
    }

    let float: f64 = prefix.parse().ok()?;
    if !float.is_finite() || float <= 0.0 {
        return None;
    }

    let exact = Decimal::from_str(prefix)
        .or_else(|_| Decimal::from_scientific(prefix))
        .ok()
        .or_else(|| Decimal::from_f64(float))
        .filter(|value| *value > Decimal::ZERO);

    match exact {
        Some(value) => Some(value),
        None if float < 1.0 => Some(Decimal::new(1, 28)),
        None => None,
    }
}

/// Longest prefix of `s` shaped like `[+-]digits[.digits][e[+-]digits]`.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    &s[..end]
}

/// Parse a rate out of a JSON string or number.
pub fn rate_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => parse_positive_rate(s),
        // Number's Display is the shortest round-trip form, so 18.89 stays 18.89.
        serde_json::Value::Number(n) => parse_positive_rate(&n.to_string()),
        _ => None,
    }
}
