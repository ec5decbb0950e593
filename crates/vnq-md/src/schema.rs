//! Provider lookup tables: endpoints, interval codes, field / dtype / value
//! maps and the index alias table.
//!
//! A [`ProviderSchema`] is plain immutable data injected into
//! [`Quote`](crate::Quote). [`ProviderSchema::vci`] is the Vietcap table set.

use std::collections::BTreeMap;

use crate::error::QuoteError;
use crate::normalizer::{dtype_map, field_map, value_map, DtypeMap, FieldMap, ValueMap};
use crate::table::Dtype;
use crate::Timeframe;

pub const VCI_SOURCE: &str = "VCI";
pub const VCI_BASE_URL: &str = "https://trading.vietcap.com.vn/api/";
const VCI_ORIGIN: &str = "https://trading.vietcap.com.vn";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Interval map
// ---------------------------------------------------------------------------

/// Provider code for a timeframe and the timeframe the provider actually
/// serves under that code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalCode {
    pub code: String,
    pub native: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalMap {
    entries: BTreeMap<Timeframe, IntervalCode>,
}

impl IntervalMap {
    pub fn new(entries: impl IntoIterator<Item = (Timeframe, IntervalCode)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn vci() -> Self {
        let code = |code: &str, native: Timeframe| IntervalCode {
            code: code.to_string(),
            native,
        };
        Self::new([
            (Timeframe::M1, code("ONE_MINUTE", Timeframe::M1)),
            (Timeframe::M5, code("ONE_MINUTE", Timeframe::M1)),
            (Timeframe::M15, code("ONE_MINUTE", Timeframe::M1)),
            (Timeframe::M30, code("ONE_MINUTE", Timeframe::M1)),
            (Timeframe::H1, code("ONE_HOUR", Timeframe::H1)),
            (Timeframe::D1, code("ONE_DAY", Timeframe::D1)),
            (Timeframe::W1, code("ONE_DAY", Timeframe::D1)),
            (Timeframe::Mo1, code("ONE_DAY", Timeframe::D1)),
        ])
    }

    /// Lookup; a timeframe the map does not serve is `InvalidInterval`.
    pub fn code(&self, tf: Timeframe) -> Result<&IntervalCode, QuoteError> {
        self.entries
            .get(&tf)
            .ok_or_else(|| QuoteError::InvalidInterval {
                value: tf.as_str().to_string(),
                valid: self.timeframes().iter().map(|t| t.as_str().to_string()).collect(),
            })
    }

    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.entries.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Provider schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSchema {
    /// Stamped on results as the `source` column / attribute.
    pub source: String,
    pub base_url: String,
    pub origin: String,
    pub history_path: String,
    pub intraday_path: String,
    pub price_depth_path: String,
    pub intervals: IntervalMap,
    pub ohlc_fields: FieldMap,
    pub ohlc_dtypes: DtypeMap,
    pub intraday_fields: FieldMap,
    pub intraday_dtypes: DtypeMap,
    pub match_types: ValueMap,
    pub depth_fields: FieldMap,
    pub depth_dtypes: DtypeMap,
    /// User-facing index name -> provider index name.
    pub index_aliases: Vec<(String, String)>,
}

impl ProviderSchema {
    pub fn vci() -> Self {
        Self {
            source: VCI_SOURCE.to_string(),
            base_url: VCI_BASE_URL.to_string(),
            origin: VCI_ORIGIN.to_string(),
            history_path: "chart/OHLCChart/gap-chart".to_string(),
            intraday_path: "market-watch/LEData/getAll".to_string(),
            price_depth_path: "market-watch/AccumulatedPriceStepVol/getSymbolData".to_string(),
            intervals: IntervalMap::vci(),
            ohlc_fields: field_map(&[
                ("t", "time"),
                ("o", "open"),
                ("h", "high"),
                ("l", "low"),
                ("c", "close"),
                ("v", "volume"),
            ]),
            ohlc_dtypes: dtype_map(&[
                ("time", Dtype::Datetime),
                ("open", Dtype::Float64),
                ("high", Dtype::Float64),
                ("low", Dtype::Float64),
                ("close", Dtype::Float64),
                ("volume", Dtype::Int64),
            ]),
            intraday_fields: field_map(&[
                ("truncTime", "time"),
                ("matchPrice", "price"),
                ("matchVol", "volume"),
                ("matchType", "match_type"),
                ("id", "id"),
            ]),
            intraday_dtypes: dtype_map(&[
                ("time", Dtype::Datetime),
                ("price", Dtype::Float64),
                ("volume", Dtype::Int64),
                ("match_type", Dtype::Utf8),
                ("id", Dtype::Int64),
            ]),
            match_types: value_map(&[("b", "Buy"), ("s", "Sell"), ("unknown", "ATO/ATC")]),
            depth_fields: field_map(&[
                ("priceStep", "price"),
                ("accumulatedVolume", "acc_volume"),
                ("accumulatedBuyVolume", "acc_buy_volume"),
                ("accumulatedSellVolume", "acc_sell_volume"),
                ("accumulatedUndefinedVolume", "acc_undefined_volume"),
            ]),
            depth_dtypes: dtype_map(&[
                ("price", Dtype::Float64),
                ("acc_volume", Dtype::Int64),
                ("acc_buy_volume", Dtype::Int64),
                ("acc_sell_volume", Dtype::Int64),
                ("acc_undefined_volume", Dtype::Int64),
            ]),
            index_aliases: vec![
                ("VNINDEX".to_string(), "VNINDEX".to_string()),
                ("HNXINDEX".to_string(), "HNXIndex".to_string()),
                ("UPCOMINDEX".to_string(), "HNXUpcomIndex".to_string()),
            ],
        }
    }

    /// Same tables, different host (tests, relays, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Browser-like headers the provider expects on every call.
    pub fn headers(&self, user_agent: &str) -> Vec<(String, String)> {
        let referer = format!("{}/", self.origin);
        [
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "en-US,en;q=0.9,vi-VN;q=0.8,vi;q=0.7"),
            ("Content-Type", "application/json"),
            ("Referer", referer.as_str()),
            ("Origin", self.origin.as_str()),
            ("User-Agent", user_agent),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Resolve an `...INDEX` symbol to the provider's name; other symbols
    /// pass through.
    pub fn resolve_index(&self, symbol: &str) -> Result<String, QuoteError> {
        if !symbol.contains("INDEX") {
            return Ok(symbol.to_string());
        }
        self.index_aliases
            .iter()
            .find(|(alias, _)| alias == symbol)
            .map(|(_, provider)| provider.clone())
            .ok_or_else(|| QuoteError::UnknownIndex {
                symbol: symbol.to_string(),
                valid: self.index_aliases.iter().map(|(a, _)| a.clone()).collect(),
            })
    }

    /// Canonical intraday columns, stamp columns included.
    pub fn intraday_columns(&self) -> Vec<(&str, Dtype)> {
        let mut cols: Vec<(&str, Dtype)> = self
            .intraday_fields
            .iter()
            .map(|(_, c)| {
                (
                    c.as_str(),
                    self.intraday_dtypes.get(c).copied().unwrap_or(Dtype::Utf8),
                )
            })
            .collect();
        cols.extend([
            ("symbol", Dtype::Utf8),
            ("asset_type", Dtype::Utf8),
            ("source", Dtype::Utf8),
        ]);
        cols
    }
}
