//! vnq-md
//!
//! Quote adapter for the Vietcap (VCI) trading API.
//!
//! This crate owns request construction and response normalization for one
//! instrument at a time: historical bars, intraday trade ticks and price-depth
//! statistics. The network exchange itself sits behind the [`Transport`] trait;
//! [`HttpTransport`] is the default blocking implementation.
//!
//! Flow per call: validation -> count estimation -> request building ->
//! transport -> normalization -> [`Table`].

pub mod error;
pub mod estimator;
pub mod http;
pub mod market;
pub mod normalizer;
pub mod quote;
pub mod records;
pub mod schema;
pub mod settings;
pub mod symbol;
pub mod table;
pub mod transport;
pub mod validation;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::QuoteError;
pub use estimator::{business_days, estimate_count, TradingCalendar};
pub use http::{HttpSettings, HttpTransport};
pub use market::{DataStatus, MarketClock, MarketStatus, VnMarketClock};
pub use quote::{HistoryQuery, IntradayQuery, Quote, QuoteBuilder};
pub use records::{BarTime, IntradayRecord, OhlcRecord, PriceDepthRecord};
pub use schema::{IntervalMap, ProviderSchema};
pub use settings::QuoteSettings;
pub use symbol::{AssetClassifier, AssetType, DefaultAssetClassifier, DefaultSymbolValidator, SymbolValidator};
pub use table::{ColumnData, Dtype, Table};
pub use transport::{HttpMethod, ProxyConfig, ProxyMode, RequestMode, Transport, TransportError, TransportRequest};
pub use validation::{validate, TickerRequest};

/// Bar granularity requested by callers.
///
/// Canonical user-facing values: `1m`, `5m`, `15m`, `30m`, `1H`, `1D`, `1W`, `1M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    D1,
    W1,
    Mo1,
}

/// Coarse family of a [`Timeframe`]; drives count estimation and bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1H",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::Mo1 => "1M",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Timeframe::M1 | Timeframe::M5 | Timeframe::M15 | Timeframe::M30 => {
                Granularity::Minute
            }
            Timeframe::H1 => Granularity::Hour,
            Timeframe::D1 => Granularity::Day,
            Timeframe::W1 => Granularity::Week,
            Timeframe::Mo1 => Granularity::Month,
        }
    }

    /// Bar width in minutes for intraday timeframes.
    pub fn minutes(&self) -> Option<u32> {
        match self {
            Timeframe::M1 => Some(1),
            Timeframe::M5 => Some(5),
            Timeframe::M15 => Some(15),
            Timeframe::M30 => Some(30),
            Timeframe::H1 => Some(60),
            _ => None,
        }
    }

    /// Daily, weekly and monthly bars carry a date rather than a timestamp.
    pub fn is_daily_or_coarser(&self) -> bool {
        matches!(
            self.granularity(),
            Granularity::Day | Granularity::Week | Granularity::Month
        )
    }

    /// Parse a user interval string.
    ///
    /// Case-insensitive, except that `M` / `1M` means month while `m` / `1m`
    /// means minute.
    pub fn parse(s: &str) -> Result<Self, QuoteError> {
        let raw = s.trim();
        if raw == "M" || raw == "1M" {
            return Ok(Timeframe::Mo1);
        }
        match raw.to_ascii_lowercase().as_str() {
            "1m" | "m" | "minute" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" | "h" | "hour" => Ok(Timeframe::H1),
            "1d" | "d" | "day" => Ok(Timeframe::D1),
            "1w" | "w" | "week" => Ok(Timeframe::W1),
            "1mo" | "mo" | "1month" | "month" => Ok(Timeframe::Mo1),
            _ => Err(QuoteError::InvalidInterval {
                value: s.to_string(),
                valid: Timeframe::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            }),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------
// Tests (no network)
// -----------------
