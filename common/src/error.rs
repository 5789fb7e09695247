//! Error types for shared monetary operations.

use crate::Currency;
use thiserror::Error;

/// Errors raised by money arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonetaryError {
    /// Operation mixed two different currencies.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// Exchange rate must be strictly positive.
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
}

/// Result type alias for monetary operations.
pub type Result<T> = std::result::Result<T, MonetaryError>;
