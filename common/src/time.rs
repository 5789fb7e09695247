//! Time utilities and constants for the storefront FX resolver.

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;

/// Resolver timing and pricing constants.
pub mod constants {
    use super::{Decimal, Duration};

    /// How long a remotely fetched rate stays in the local cache (24 hours).
    pub fn rate_cache_ttl() -> Duration {
        Duration::hours(24)
    }

    /// How often the admin quota display is refreshed (1 minute).
    pub fn quota_refresh_interval() -> Duration {
        Duration::seconds(60)
    }

    /// Static USD/ZMW rate used when nothing better is available.
    pub fn fallback_rate() -> Decimal {
        Decimal::new(1889, 2)
    }

    /// Monthly request allowance of the exchange-rate API plan.
    pub const QUOTA_LIMIT: u64 = 1500;
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Calendar month key in `YYYY-MM` form, the unit the quota counter resets on.
pub fn month_key(at: Timestamp) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_month_key_padding() {
        let jan = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(month_key(jan), "2025-01");

        let next = jan + Duration::seconds(1);
        assert_eq!(month_key(next), "2025-02");

        let dec = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(month_key(dec), "2024-12");
    }

    #[test]
    fn test_constants() {
        assert_eq!(constants::rate_cache_ttl(), Duration::seconds(86_400));
        assert_eq!(constants::fallback_rate().to_string(), "18.89");
        assert_eq!(
            constants::quota_refresh_interval().as_std(),
            std::time::Duration::from_secs(60)
        );
    }

    proptest! {
        #[test]
        fn month_key_tracks_calendar_month(secs in 0i64..4_102_444_800) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let key = month_key(at);

            prop_assert_eq!(key.len(), 7);
            prop_assert_eq!(&key[..4], format!("{:04}", at.year()));
            prop_assert_eq!(key[5..].parse::<u32>().unwrap(), at.month());
        }
    }
}
