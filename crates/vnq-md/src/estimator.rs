//! Record-count ("count back") estimation for history requests.
//!
//! The provider wants "how many bars ending at `to`", while callers speak in
//! time windows. Only weekends are skipped; exchange holidays are not modelled.

use chrono::{Datelike, NaiveDateTime, Weekday};
use chrono_tz::Tz;

use crate::{Granularity, Timeframe};

/// Calendar constants used by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingCalendar {
    /// Trading hours per business day.
    pub session_hours: f64,
    /// Count used when no window is known (or for weekly / monthly bars).
    pub fallback_count: u32,
    /// Market timezone; naive datetimes are wall-clock times here.
    pub tz: Tz,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self {
            session_hours: 6.5,
            fallback_count: 1000,
            tz: chrono_tz::Asia::Ho_Chi_Minh,
        }
    }
}

fn is_weekday(d: Weekday) -> bool {
    !matches!(d, Weekday::Sat | Weekday::Sun)
}

/// Monday..Friday dates from `start`'s date to `end`'s date, both inclusive.
/// Times of day are ignored. Zero when `start > end`.
pub fn business_days(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    if start > end {
        return 0;
    }
    let total = (end.date() - start.date()).num_days() + 1;
    let mut count = total / 7 * 5;
    let mut day = start.date().weekday();
    for _ in 0..(total % 7) {
        if is_weekday(day) {
            count += 1;
        }
        day = day.succ();
    }
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn ceil_count(x: f64) -> u32 {
    let c = x.ceil();
    if c >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        c as u32
    }
}

/// How many bars to ask for.
///
/// `explicit` always wins. Without a caller `end` the calendar fallback is
/// used. `end` must already be the effective end (a date-only end advanced by
/// one day).
pub fn estimate_count(
    calendar: &TradingCalendar,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    timeframe: Timeframe,
    explicit: Option<u32>,
) -> u32 {
    if let Some(n) = explicit {
        return n;
    }
    let Some(end) = end else {
        return calendar.fallback_count;
    };

    let bd = f64::from(business_days(start, end));
    match timeframe.granularity() {
        Granularity::Day => ceil_count(bd + 1.0),
        Granularity::Hour => ceil_count(bd * calendar.session_hours + 1.0),
        Granularity::Minute => ceil_count(bd * calendar.session_hours * 60.0 + 1.0),
        Granularity::Week | Granularity::Month => calendar.fallback_count,
    }
}
