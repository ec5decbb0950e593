//! Quote adapter: one instrument, three operations.
//!
//! `history` -> OHLCV bars, `intraday` -> matched trades, `price_depth` ->
//! accumulated volume per price step. Each call validates its inputs, builds
//! one provider request, hands it to the [`Transport`] and normalizes the
//! answer into a [`Table`].

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::QuoteError;
use crate::estimator::estimate_count;
use crate::http::HttpTransport;
use crate::market::{MarketClock, VnMarketClock};
use crate::normalizer::{
    empty_table, local_to_epoch, map_values, normalize_bars, normalize_rows, resample,
    round_floats, stamp,
};
use crate::schema::ProviderSchema;
use crate::settings::QuoteSettings;
use crate::symbol::{
    AssetClassifier, AssetType, DefaultAssetClassifier, DefaultSymbolValidator, SymbolValidator,
};
use crate::table::Table;
use crate::transport::{is_empty_payload, HttpMethod, Transport, TransportRequest};
use crate::validation::{TickerRequest, DATETIME_FORMAT};

const PRICE_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Arguments of [`Quote::history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub start: String,
    pub end: Option<String>,
    pub interval: String,
    pub show_log: bool,
    /// Overrides the estimated record count when set.
    pub count_back: Option<u32>,
    /// Decimal places kept on price columns.
    pub floating: u32,
}

impl HistoryQuery {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            interval: "1D".to_string(),
            show_log: false,
            count_back: None,
            floating: 2,
        }
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn show_log(mut self, show_log: bool) -> Self {
        self.show_log = show_log;
        self
    }

    pub fn count_back(mut self, n: u32) -> Self {
        self.count_back = Some(n);
        self
    }

    pub fn floating(mut self, decimals: u32) -> Self {
        self.floating = decimals;
        self
    }
}

/// Arguments of [`Quote::intraday`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradayQuery {
    pub page_size: u32,
    /// Only trades after this cut-off (provider `truncTime`).
    pub last_time: Option<String>,
    pub show_log: bool,
}

impl Default for IntradayQuery {
    fn default() -> Self {
        Self {
            page_size: 100,
            last_time: None,
            show_log: false,
        }
    }
}

impl IntradayQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = n;
        self
    }

    pub fn last_time(mut self, t: impl Into<String>) -> Self {
        self.last_time = Some(t.into());
        self
    }

    pub fn show_log(mut self, show_log: bool) -> Self {
        self.show_log = show_log;
        self
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

pub fn history_payload(code: &str, symbol: &str, to: i64, count_back: u32) -> Value {
    json!({
        "timeFrame": code,
        "symbols": [symbol],
        "to": to,
        "countBack": count_back,
    })
}

pub fn intraday_payload(symbol: &str, page_size: u32, last_time: Option<&str>) -> Value {
    json!({
        "symbol": symbol,
        "limit": page_size,
        "truncTime": last_time,
    })
}

pub fn price_depth_payload(symbol: &str) -> Value {
    json!({ "symbol": symbol })
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct QuoteBuilder {
    symbol: String,
    settings: QuoteSettings,
    schema: Option<ProviderSchema>,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn MarketClock>>,
    validator: Option<Arc<dyn SymbolValidator>>,
    classifier: Option<Arc<dyn AssetClassifier>>,
}

impl QuoteBuilder {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            settings: QuoteSettings::default(),
            schema: None,
            transport: None,
            clock: None,
            validator: None,
            classifier: None,
        }
    }

    pub fn settings(mut self, settings: QuoteSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the VCI tables; `settings.base_url` is then not applied.
    pub fn schema(mut self, schema: ProviderSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn MarketClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn symbol_validator(mut self, validator: Arc<dyn SymbolValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn asset_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Validate the symbol, resolve index aliases and wire default
    /// collaborators for anything not supplied.
    pub fn build(self) -> Result<Quote, QuoteError> {
        let settings = self.settings;
        let schema = self
            .schema
            .unwrap_or_else(|| ProviderSchema::vci().with_base_url(settings.base_url.clone()));
        let classifier: Arc<dyn AssetClassifier> = self
            .classifier
            .unwrap_or_else(|| Arc::new(DefaultAssetClassifier) as Arc<dyn AssetClassifier>);
        let validator: Arc<dyn SymbolValidator> = self.validator.unwrap_or_else(|| {
            Arc::new(DefaultSymbolValidator::new(classifier.clone())) as Arc<dyn SymbolValidator>
        });

        let normalized = validator.validate(&self.symbol)?;
        let asset_type = classifier
            .classify(&normalized)
            .ok_or_else(|| QuoteError::InvalidSymbol {
                symbol: self.symbol.clone(),
                reason: "symbol does not match any known instrument type".to_string(),
            })?;
        let symbol = schema.resolve_index(&normalized)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(settings.http.clone())?),
        };
        let clock: Arc<dyn MarketClock> = self.clock.unwrap_or_else(|| {
            Arc::new(VnMarketClock::new(settings.calendar.tz)) as Arc<dyn MarketClock>
        });
        let headers = schema.headers(&settings.user_agent);

        debug!(symbol = %symbol, asset_type = %asset_type, source = %schema.source, "quote adapter ready");

        Ok(Quote {
            symbol,
            asset_type,
            headers,
            schema,
            settings,
            transport,
            clock,
        })
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Session state for one instrument. Immutable after construction.
pub struct Quote {
    symbol: String,
    asset_type: AssetType,
    headers: Vec<(String, String)>,
    schema: ProviderSchema,
    settings: QuoteSettings,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn MarketClock>,
}

impl fmt::Debug for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quote")
            .field("symbol", &self.symbol)
            .field("asset_type", &self.asset_type)
            .field("source", &self.schema.source)
            .field("base_url", &self.schema.base_url)
            .finish_non_exhaustive()
    }
}

impl Quote {
    /// Default collaborators and settings.
    pub fn new(symbol: impl Into<String>) -> Result<Self, QuoteError> {
        QuoteBuilder::new(symbol).build()
    }

    pub fn builder(symbol: impl Into<String>) -> QuoteBuilder {
        QuoteBuilder::new(symbol)
    }

    /// Provider symbol (index aliases already resolved).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn schema(&self) -> &ProviderSchema {
        &self.schema
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn request(&self, path: &str, payload: Value, show_log: bool) -> TransportRequest {
        TransportRequest {
            url: self.schema.url(path),
            headers: self.headers.clone(),
            method: HttpMethod::Post,
            payload: Some(payload),
            show_log,
            proxy: self.settings.proxy.clone(),
        }
    }

    fn ensure_market_available(&self, what: &str) -> Result<(), QuoteError> {
        let status = self.clock.status_now();
        if status.is_unavailable() {
            return Err(QuoteError::MarketUnavailable {
                time: status.time.format(DATETIME_FORMAT).to_string(),
                message: format!(
                    "{what} is not available while the next trading session is being prepared; try again later"
                ),
            });
        }
        Ok(())
    }

    /// Historical OHLCV bars.
    ///
    /// Daily and coarser bars carry a `Date` time column; intraday bars a
    /// `Datetime` in market-local time.
    pub fn history(&self, q: &HistoryQuery) -> Result<Table, QuoteError> {
        let ticker = TickerRequest::build(
            self.symbol.clone(),
            &q.start,
            q.end.as_deref(),
            &q.interval,
        )?;
        let tf = ticker.timeframe();
        let interval = self.schema.intervals.code(tf)?;
        let calendar = &self.settings.calendar;

        let count_back = estimate_count(calendar, ticker.start(), ticker.end(), tf, q.count_back);
        let end_time = ticker
            .end()
            .unwrap_or_else(|| self.clock.now() + Duration::days(1));
        let to = local_to_epoch(end_time, calendar.tz);

        if q.show_log {
            info!(symbol = %self.symbol, interval = %tf, code = %interval.code, to, count_back, "history request");
        } else {
            debug!(symbol = %self.symbol, interval = %tf, code = %interval.code, to, count_back, "history request");
        }

        let req = self.request(
            &self.schema.history_path,
            history_payload(&interval.code, &self.symbol, to, count_back),
            q.show_log,
        );
        let no_data = || QuoteError::NoData {
            symbol: self.symbol.clone(),
        };
        let payload = self
            .transport
            .send_request(&req)?
            .filter(|v| !is_empty_payload(v))
            .ok_or_else(no_data)?;

        let mut table = normalize_bars(
            &payload,
            &self.schema.ohlc_fields,
            &self.schema.ohlc_dtypes,
            calendar.tz,
        )?;
        if table.is_empty() {
            return Err(no_data());
        }
        if interval.native != tf {
            debug!(from = %interval.native, to = %tf, rows = table.height(), "resampling bars");
            table = resample(&table, tf)?;
        }
        round_floats(&mut table, &PRICE_COLUMNS, q.floating);
        if tf.is_daily_or_coarser() {
            table.coerce_date("time")?;
        }

        table.set_attr("source", self.schema.source.clone());
        table.set_attr("symbol", self.symbol.clone());
        table.set_attr("interval", tf.as_str());
        Ok(table)
    }

    /// Matched trades of the current session.
    pub fn intraday(&self, q: &IntradayQuery) -> Result<Table, QuoteError> {
        self.ensure_market_available("intraday trade data")?;

        if q.page_size > self.settings.page_size_warn_threshold {
            warn!(
                page_size = q.page_size,
                threshold = self.settings.page_size_warn_threshold,
                "large intraday page size; the provider may be slow or truncate the result"
            );
        }

        let req = self.request(
            &self.schema.intraday_path,
            intraday_payload(&self.symbol, q.page_size, q.last_time.as_deref()),
            q.show_log,
        );
        let payload = self
            .transport
            .send_request(&req)?
            .filter(|v| !is_empty_payload(v));

        let mut table = match payload {
            None => Table::empty_with_schema(&self.schema.intraday_columns()),
            Some(payload) => {
                let mut t = normalize_rows(
                    &payload,
                    &self.schema.intraday_fields,
                    &self.schema.intraday_dtypes,
                    self.settings.calendar.tz,
                )?;
                map_values(&mut t, "match_type", &self.schema.match_types)?;
                stamp(&mut t, "symbol", &self.symbol)?;
                stamp(&mut t, "asset_type", self.asset_type.as_str())?;
                stamp(&mut t, "source", &self.schema.source)?;
                t
            }
        };
        table.set_attr("source", self.schema.source.clone());
        Ok(table)
    }

    /// Accumulated volume per price step for the current session.
    pub fn price_depth(&self, show_log: bool) -> Result<Table, QuoteError> {
        self.ensure_market_available("price depth data")?;

        let req = self.request(
            &self.schema.price_depth_path,
            price_depth_payload(&self.symbol),
            show_log,
        );
        let payload = self
            .transport
            .send_request(&req)?
            .filter(|v| !is_empty_payload(v));
        let mut table = match payload {
            None => empty_table(&self.schema.depth_fields, &self.schema.depth_dtypes),
            Some(payload) => normalize_rows(
                &payload,
                &self.schema.depth_fields,
                &self.schema.depth_dtypes,
                self.settings.calendar.tz,
            )?,
        };
        table.set_attr("source", self.schema.source.clone());
        Ok(table)
    }
}
