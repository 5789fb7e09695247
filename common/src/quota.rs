//! Monthly usage counter for the paid exchange-rate API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::{month_key, Timestamp};

/// Calls made to the remote rate API in one calendar month.
///
/// The counter itself lives on the backend; a new `month` string means a
/// fresh counter, so there is no reset logic on this side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub count: u64,
    pub month: String,
}

impl QuotaUsage {
    /// Zeroed usage for the month containing `at`.
    pub fn empty(at: Timestamp) -> Self {
        Self {
            count: 0,
            month: month_key(at),
        }
    }

    /// Share of `limit` used, in percent.
    pub fn percentage(&self, limit: u64) -> f64 {
        if limit == 0 {
            return 100.0;
        }
        self.count as f64 * 100.0 / limit as f64
    }

    /// Banner severity for this usage.
    pub fn level(&self, limit: u64) -> QuotaLevel {
        let pct = self.percentage(limit);
        if pct >= 95.0 {
            QuotaLevel::Critical
        } else if pct >= 80.0 {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }

    /// Requests left before the plan limit.
    pub fn remaining(&self, limit: u64) -> u64 {
        limit.saturating_sub(self.count)
    }
}

/// Severity shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLevel {
    Normal,
    /// 80% or more of the plan used.
    Warning,
    /// 95% or more of the plan used.
    Critical,
}

impl fmt::Display for QuotaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuotaLevel::Normal => "normal",
            QuotaLevel::Warning => "warning",
            QuotaLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::constants::QUOTA_LIMIT;
    use chrono::{TimeZone, Utc};

    fn usage(count: u64) -> QuotaUsage {
        QuotaUsage {
            count,
            month: "2025-01".to_string(),
        }
    }

    #[test]
    fn test_empty_tracks_month() {
        let at = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let quota = QuotaUsage::empty(at);
        assert_eq!(quota.count, 0);
        assert_eq!(quota.month, "2025-03");
    }

    #[test]
    fn test_levels() {
        assert_eq!(usage(0).level(QUOTA_LIMIT), QuotaLevel::Normal);
        assert_eq!(usage(1199).level(QUOTA_LIMIT), QuotaLevel::Normal);
        assert_eq!(usage(1200).level(QUOTA_LIMIT), QuotaLevel::Warning);
        assert_eq!(usage(1425).level(QUOTA_LIMIT), QuotaLevel::Critical);
        assert_eq!(usage(2000).level(QUOTA_LIMIT), QuotaLevel::Critical);
    }

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(usage(100).remaining(QUOTA_LIMIT), 1400);
        assert_eq!(usage(1600).remaining(QUOTA_LIMIT), 0);
    }

    #[test]
    fn test_wire_format() {
        let quota: QuotaUsage = serde_json::from_str(r#"{"count":7,"month":"2025-01"}"#).unwrap();
        assert_eq!(quota, usage(7));
    }
}
