//! Market-hours oracle.
//!
//! Intraday and price-depth data are not served while the exchange prepares
//! the next session; [`MarketClock`] tells the adapter when that is.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    /// Before the morning session; live endpoints are empty or stale.
    Preparing,
    Realtime,
    /// Session over for the day (or weekend).
    Completed,
}

impl DataStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStatus::Preparing => "preparing",
            DataStatus::Realtime => "realtime",
            DataStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketStatus {
    pub is_trading_hour: bool,
    pub data_status: DataStatus,
    /// Market-local wall-clock time the status was computed for.
    pub time: NaiveDateTime,
}

impl MarketStatus {
    /// Live data cannot be fetched right now.
    pub fn is_unavailable(&self) -> bool {
        !self.is_trading_hour && self.data_status == DataStatus::Preparing
    }
}

pub trait MarketClock: Send + Sync {
    /// Current market-local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    fn trading_hours(&self, at: NaiveDateTime) -> MarketStatus;

    fn status_now(&self) -> MarketStatus {
        self.trading_hours(self.now())
    }
}

// Session boundaries in minutes after local midnight.
const MORNING_OPEN: u32 = 9 * 60;
const LUNCH_START: u32 = 11 * 60 + 30;
const AFTERNOON_OPEN: u32 = 13 * 60;
const CLOSE: u32 = 14 * 60 + 45;

/// HOSE / HNX session schedule in Asia/Ho_Chi_Minh.
#[derive(Debug, Clone, Copy)]
pub struct VnMarketClock {
    tz: Tz,
}

impl VnMarketClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Default for VnMarketClock {
    fn default() -> Self {
        Self::new(chrono_tz::Asia::Ho_Chi_Minh)
    }
}

impl MarketClock for VnMarketClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }

    fn trading_hours(&self, at: NaiveDateTime) -> MarketStatus {
        let status = |is_trading_hour, data_status| MarketStatus {
            is_trading_hour,
            data_status,
            time: at,
        };

        if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            return status(false, DataStatus::Completed);
        }

        let minute = at.hour() * 60 + at.minute();
        match minute {
            m if m < MORNING_OPEN => status(false, DataStatus::Preparing),
            m if m < LUNCH_START => status(true, DataStatus::Realtime),
            m if m < AFTERNOON_OPEN => status(false, DataStatus::Realtime),
            m if m < CLOSE => status(true, DataStatus::Realtime),
            _ => status(false, DataStatus::Completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn weekday_schedule() {
        let c = VnMarketClock::default();
        let cases = [
            ("2024-01-02 08:59:00", false, DataStatus::Preparing),
            ("2024-01-02 09:00:00", true, DataStatus::Realtime),
            ("2024-01-02 11:29:00", true, DataStatus::Realtime),
            ("2024-01-02 12:00:00", false, DataStatus::Realtime),
            ("2024-01-02 13:00:00", true, DataStatus::Realtime),
            ("2024-01-02 14:44:00", true, DataStatus::Realtime),
            ("2024-01-02 14:45:00", false, DataStatus::Completed),
            ("2024-01-02 20:00:00", false, DataStatus::Completed),
        ];
        for (t, trading, data) in cases {
            let s = c.trading_hours(dt(t));
            assert_eq!(s.is_trading_hour, trading, "{t}");
            assert_eq!(s.data_status, data, "{t}");
        }
    }

    #[test]
    fn weekend_is_completed_and_available() {
        let s = VnMarketClock::default().trading_hours(dt("2024-01-06 08:00:00"));
        assert_eq!(s.data_status, DataStatus::Completed);
        assert!(!s.is_unavailable());
    }

    #[test]
    fn only_pre_open_is_unavailable() {
        let c = VnMarketClock::default();
        assert!(c.trading_hours(dt("2024-01-02 07:30:00")).is_unavailable());
        assert!(!c.trading_hours(dt("2024-01-02 12:00:00")).is_unavailable());
    }
}
