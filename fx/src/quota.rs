//! Monthly quota tracking for the remote rate API.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use storefront_common::{now, QuotaUsage};
use tracing::{debug, warn};

use crate::error::FxResult;

/// Admin route prefix on which quota is tracked.
pub const ADMIN_PREFIX: &str = "/admin";

/// Admin login route, never tracked.
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Who is asking and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminSession {
    /// Current route path, e.g. `/admin/orders`.
    pub path: String,
    /// Admin JWT, if signed in.
    pub admin_token: Option<String>,
}

impl AdminSession {
    pub fn new(path: impl Into<String>, admin_token: Option<String>) -> Self {
        Self {
            path: path.into(),
            admin_token,
        }
    }

    /// An anonymous storefront visitor.
    pub fn anonymous(path: impl Into<String>) -> Self {
        Self::new(path, None)
    }

    /// Whether calls from this session may read or bump the backend counter.
    ///
    /// Only authenticated admins on admin routes other than the login page
    /// count, so storefront traffic never inflates usage.
    pub fn tracks_quota(&self) -> bool {
        if !self.path.starts_with(ADMIN_PREFIX) || self.path == ADMIN_LOGIN_PATH {
            return false;
        }
        self.admin_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Backend-held quota counter.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Read this month's usage.
    async fn fetch_quota(&self) -> FxResult<QuotaUsage>;

    /// Record one remote call and return the updated usage.
    async fn increment_quota(&self) -> FxResult<QuotaUsage>;
}

/// Gated front for a [`QuotaStore`].
///
/// Both operations are infallible: failures are logged and degrade to a
/// zeroed usage for the current month.
pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    session: RwLock<AdminSession>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn QuotaStore>, session: AdminSession) -> Self {
        Self {
            store,
            session: RwLock::new(session),
        }
    }

    /// Replace the current session (sign-in, sign-out, navigation).
    pub fn set_session(&self, session: AdminSession) {
        *self.session.write() = session;
    }

    /// Whether quota calls currently reach the backend.
    pub fn is_active(&self) -> bool {
        self.session.read().tracks_quota()
    }

    /// Read usage, or a zeroed default when tracking is inactive or fails.
    pub async fn get_quota(&self) -> QuotaUsage {
        if !self.is_active() {
            return QuotaUsage::empty(now());
        }

        match self.store.fetch_quota().await {
            Ok(quota) => quota,
            Err(e) => {
                warn!(error = %e, "Failed to fetch quota from backend");
                QuotaUsage::empty(now())
            }
        }
    }

    /// Record a remote call.
    ///
    /// Inactive tracking returns the same as [`get_quota`](Self::get_quota)
    /// without touching the backend. A failed increment is not retried; the
    /// current usage is read back instead.
    pub async fn increment_quota(&self) -> QuotaUsage {
        if !self.is_active() {
            debug!("Quota tracking inactive, skipping increment");
            return self.get_quota().await;
        }

        match self.store.increment_quota().await {
            Ok(quota) => quota,
            Err(e) => {
                warn!(error = %e, "Failed to increment quota on backend");
                self.get_quota().await
            }
        }
    }
}

/// In-memory quota counter that resets when the month changes.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MemoryQuotaStore {
    usage: parking_lot::Mutex<Option<QuotaUsage>>,
    fail_increment: std::sync::atomic::AtomicBool,
    fail_fetch: std::sync::atomic::AtomicBool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the counter.
    pub fn set_usage(&self, usage: QuotaUsage) {
        *self.usage.lock() = Some(usage);
    }

    pub fn fail_increment(&self, fail: bool) {
        self.fail_increment
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Backend calls received, of either kind.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Counter value as the backend sees it.
    pub fn count(&self) -> u64 {
        self.current().count
    }

    fn current(&self) -> QuotaUsage {
        let month = storefront_common::month_key(now());
        let mut usage = self.usage.lock();
        match usage.as_ref() {
            Some(u) if u.month == month => u.clone(),
            _ => {
                let fresh = QuotaUsage { count: 0, month };
                *usage = Some(fresh.clone());
                fresh
            }
        }
    }

    fn unavailable() -> crate::error::FxError {
        crate::error::FxError::Upstream {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn fetch_quota(&self) -> FxResult<QuotaUsage> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_fetch.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.current())
    }

    async fn increment_quota(&self) -> FxResult<QuotaUsage> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_increment.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut next = self.current();
        next.count += 1;
        *self.usage.lock() = Some(next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_common::month_key;

    fn admin() -> AdminSession {
        AdminSession::new("/admin/orders", Some("jwt".to_string()))
    }

    fn tracker(session: AdminSession) -> (Arc<MemoryQuotaStore>, QuotaTracker) {
        let store = Arc::new(MemoryQuotaStore::new());
        let tracker = QuotaTracker::new(store.clone(), session);
        (store, tracker)
    }

    #[test]
    fn test_session_gating() {
        assert!(admin().tracks_quota());
        assert!(AdminSession::new("/admin", Some("jwt".into())).tracks_quota());
        assert!(!AdminSession::new("/admin/login", Some("jwt".into())).tracks_quota());
        assert!(!AdminSession::new("/products/12", Some("jwt".into())).tracks_quota());
        assert!(!AdminSession::anonymous("/admin/orders").tracks_quota());
        assert!(!AdminSession::new("/admin/orders", Some("  ".into())).tracks_quota());
    }

    #[tokio::test]
    async fn test_increment_on_storefront_route_is_noop() {
        let (store, tracker) = tracker(AdminSession::anonymous("/checkout"));

        let quota = tracker.increment_quota().await;

        assert_eq!(quota.count, 0);
        assert_eq!(quota.month, month_key(now()));
        assert_eq!(store.calls(), 0);
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_increment_on_login_page_is_noop() {
        let (store, tracker) = tracker(AdminSession::new("/admin/login", Some("jwt".into())));

        tracker.increment_quota().await;

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_admin_increment() {
        let (store, tracker) = tracker(admin());

        assert_eq!(tracker.increment_quota().await.count, 1);
        assert_eq!(tracker.increment_quota().await.count, 2);
        assert_eq!(tracker.get_quota().await.count, 2);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_increment_failure_reads_current() {
        let (store, tracker) = tracker(admin());
        store.set_usage(QuotaUsage {
            count: 41,
            month: month_key(now()),
        });
        store.fail_increment(true);

        let quota = tracker.increment_quota().await;

        assert_eq!(quota.count, 41);
        // one failed increment, one read-back, no retry
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_defaults_to_zero() {
        let (store, tracker) = tracker(admin());
        store.fail_fetch(true);

        let quota = tracker.get_quota().await;

        assert_eq!(quota, QuotaUsage::empty(now()));
    }

    #[tokio::test]
    async fn test_month_rollover_resets_count() {
        let (store, tracker) = tracker(admin());
        store.set_usage(QuotaUsage {
            count: 1499,
            month: "1999-12".to_string(),
        });

        let quota = tracker.get_quota().await;

        assert_eq!(quota.count, 0);
        assert_eq!(quota.month, month_key(now()));
    }

    #[tokio::test]
    async fn test_session_change_activates_tracking() {
        let (store, tracker) = tracker(AdminSession::anonymous("/admin/login"));
        assert!(!tracker.is_active());

        tracker.set_session(admin());
        tracker.increment_quota().await;

        assert!(tracker.is_active());
        assert_eq!(store.count(), 1);
    }
}
