//! Wall-clock access pinned to the configured time zone.
//!
//! Audit timestamps and "today" both come from a [`LocalClock`], so tests can
//! freeze time and deployments can choose their zone in config.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
    frozen: Option<DateTime<Utc>>,
}

impl LocalClock {
    /// A clock that reads the system time.
    #[must_use]
    pub const fn system(tz: Tz) -> Self {
        Self { tz, frozen: None }
    }

    /// A clock stuck at `instant`.
    #[must_use]
    pub const fn fixed(tz: Tz, instant: DateTime<Utc>) -> Self {
        Self {
            tz,
            frozen: Some(instant),
        }
    }

    #[must_use]
    pub const fn time_zone(&self) -> Tz {
        self.tz
    }

    #[must_use]
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.frozen.unwrap_or_else(Utc::now)
    }

    /// Current local time with its UTC offset resolved.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.tz).fixed_offset()
    }

    /// Local calendar date, the cutoff used by status derivation.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now_utc().with_timezone(&self.tz).date_naive()
    }

    /// Current instant as UTC microseconds, used for row ordering.
    #[must_use]
    pub fn now_us(&self) -> i64 {
        self.now_utc().timestamp_micros()
    }
}

#[cfg(test)]
mod tests {
    use super::LocalClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn today_follows_the_configured_zone() {
        // 03:00 UTC is still the previous evening in Chicago.
        let instant = Utc.with_ymd_and_hms(2026, 7, 2, 3, 0, 0).unwrap();
        let clock = LocalClock::fixed(chrono_tz::America::Chicago, instant);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(clock.now().offset().local_minus_utc(), -5 * 3600);

        let utc_clock = LocalClock::fixed(chrono_tz::UTC, instant);
        assert_eq!(utc_clock.today(), NaiveDate::from_ymd_opt(2026, 7, 2).unwrap());
    }
}
