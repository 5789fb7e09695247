//! Storefront FX Common Types
//!
//! This crate contains shared types used across the storefront FX resolver,
//! including currency and money types, quota usage, and time helpers.

pub mod monetary;
pub mod quota;
pub mod error;
pub mod time;

pub use monetary::*;
pub use quota::*;
pub use error::*;
pub use time::*;
