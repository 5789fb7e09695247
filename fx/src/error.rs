//! FX resolver error types.

use storefront_common::MonetaryError;
use thiserror::Error;

/// Errors raised by the resolver's collaborators.
///
/// None of these reach callers of `ExchangeRateResolver::resolve_rate`;
/// they drive the fallback chain instead.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Upstream answered 2xx but the payload was unusable.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Local key/value storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Money arithmetic failed.
    #[error(transparent)]
    Monetary(#[from] MonetaryError),
}

impl From<std::io::Error> for FxError {
    fn from(err: std::io::Error) -> Self {
        FxError::Storage(err.to_string())
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
