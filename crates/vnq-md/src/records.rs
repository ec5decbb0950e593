//! Typed row views over result tables (`Table::records::<T>()`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Bar timestamp: a date for daily and coarser bars, a datetime otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BarTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl BarTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            BarTime::Date(d) => *d,
            BarTime::DateTime(t) => t.date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    pub time: BarTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayRecord {
    pub time: NaiveDateTime,
    pub price: f64,
    pub volume: i64,
    /// `Buy`, `Sell` or `ATO/ATC`.
    pub match_type: String,
    pub id: i64,
    pub symbol: String,
    pub asset_type: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDepthRecord {
    pub price: f64,
    pub acc_volume: i64,
    pub acc_buy_volume: i64,
    pub acc_sell_volume: i64,
    pub acc_undefined_volume: i64,
}
