//! Storefront FX Resolver
//!
//! Resolves the USD to local currency rate shown across the storefront and
//! tracks monthly usage of the paid exchange-rate API.
//!
//! # Features
//!
//! - Admin-configured manual rate override
//! - Persistent rate cache with a 24 hour TTL
//! - Remote lookup with stale-cache and constant fallbacks
//! - Monthly quota counter, tracked only for signed-in admins
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storefront_fx::{ExchangeRateResolver, QuotaTracker, AdminSession, ResolverConfig};
//!
//! let quota = QuotaTracker::new(backend.clone(), AdminSession::anonymous("/products"));
//! let resolver = ExchangeRateResolver::new(provider, backend, quota, store, ResolverConfig::default());
//!
//! let resolution = resolver.resolve_rate().await;
//! println!("{} via {}", resolution.rate, resolution.source);
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod quota;
pub mod settings;
pub mod storage;

pub use backend::BackendClient;
pub use cache::{CachedRate, RateCache, RateCacheConfig};
pub use config::FxConfig;
pub use engine::{ExchangeRateResolver, QuotaRefreshHandle, RateState, Resolution, ResolverConfig};
pub use error::{FxError, FxResult};
pub use provider::{ExchangeRateApiProvider, RateProvider, RemoteRate};
pub use quota::{AdminSession, QuotaStore, QuotaTracker};
pub use settings::{SettingsStore, StaticSettings};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore};
