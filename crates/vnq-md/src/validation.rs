//! Input validation: symbol, time window and interval -> [`TickerRequest`].
//!
//! Everything here runs before any network call.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::QuoteError;
use crate::schema::ProviderSchema;
use crate::symbol::SymbolValidator;
use crate::Timeframe;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
///
/// The flag is `true` when only a date was given.
pub fn parse_time(value: &str) -> Result<(NaiveDateTime, bool), QuoteError> {
    let v = value.trim();
    if let Ok(t) = NaiveDateTime::parse_from_str(v, DATETIME_FORMAT) {
        return Ok((t, false));
    }
    if let Ok(d) = NaiveDate::parse_from_str(v, DATE_FORMAT) {
        return Ok((d.and_time(NaiveTime::MIN), true));
    }
    Err(QuoteError::InvalidDateFormat {
        value: value.to_string(),
    })
}

/// Validate the symbol, then map index aliases to provider names.
pub fn resolve_symbol(
    validator: &dyn SymbolValidator,
    schema: &ProviderSchema,
    symbol: &str,
) -> Result<String, QuoteError> {
    let normalized = validator.validate(symbol)?;
    schema.resolve_index(&normalized)
}

/// A validated history request window. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRequest {
    symbol: String,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    timeframe: Timeframe,
}

impl TickerRequest {
    /// Window and interval checks for an already validated symbol.
    ///
    /// A date-only `end` covers that whole day: it is advanced by one day.
    pub fn build(
        symbol: impl Into<String>,
        start: &str,
        end: Option<&str>,
        interval: &str,
    ) -> Result<Self, QuoteError> {
        let timeframe = Timeframe::parse(interval)?;
        let (start, _) = parse_time(start)?;
        let end = match end {
            Some(raw) => {
                let (t, date_only) = parse_time(raw)?;
                Some(if date_only { t + Duration::days(1) } else { t })
            }
            None => None,
        };

        if let Some(end) = end {
            if start > end {
                return Err(QuoteError::InvalidRange { start, end });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            start,
            end,
            timeframe,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Effective end; `None` when the caller gave no end.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }
}

/// Full validation flow: symbol (validator + index table), interval, dates.
pub fn validate(
    validator: &dyn SymbolValidator,
    schema: &ProviderSchema,
    symbol: &str,
    start: &str,
    end: Option<&str>,
    interval: &str,
) -> Result<TickerRequest, QuoteError> {
    let symbol = resolve_symbol(validator, schema, symbol)?;
    TickerRequest::build(symbol, start, end, interval)
}
