//! Error type returned by every public adapter operation.
//!
//! Validation variants are produced before any network call. Transport and
//! decode failures are carried unmodified so callers can inspect them via
//! [`std::error::Error::source`].

use std::fmt;

use chrono::NaiveDateTime;

use crate::normalizer::NormalizeError;
use crate::transport::TransportError;

#[derive(Debug)]
pub enum QuoteError {
    /// The symbol validator rejected the input.
    InvalidSymbol { symbol: String, reason: String },
    /// An `...INDEX` symbol with no entry in the index table.
    UnknownIndex { symbol: String, valid: Vec<String> },
    /// Interval not recognised, or not served by the provider's interval map.
    InvalidInterval { value: String, valid: Vec<String> },
    /// A date string matched neither accepted format.
    InvalidDateFormat { value: String },
    /// Start is after the effective end.
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Intraday / depth data is not served while the next session is being prepared.
    MarketUnavailable { time: String, message: String },
    /// The provider returned nothing for a history request.
    NoData { symbol: String },
    Transport(TransportError),
    Decode(NormalizeError),
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::InvalidSymbol { symbol, reason } => {
                write!(f, "invalid symbol '{symbol}': {reason}")
            }
            QuoteError::UnknownIndex { symbol, valid } => write!(
                f,
                "unknown index '{symbol}'. valid values: {}",
                valid.join(", ")
            ),
            QuoteError::InvalidInterval { value, valid } => write!(
                f,
                "invalid interval '{value}'. choose one of: {}",
                valid.join(", ")
            ),
            QuoteError::InvalidDateFormat { value } => write!(
                f,
                "invalid date format '{value}'. use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"
            ),
            QuoteError::InvalidRange { start, end } => write!(
                f,
                "start ({start}) must not be after end ({end})"
            ),
            QuoteError::MarketUnavailable { time, message } => write!(f, "{time}: {message}"),
            QuoteError::NoData { symbol } => write!(
                f,
                "no data returned for '{symbol}'. check the symbol or the requested time range"
            ),
            QuoteError::Transport(e) => write!(f, "{e}"),
            QuoteError::Decode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for QuoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuoteError::Transport(e) => Some(e),
            QuoteError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for QuoteError {
    fn from(e: TransportError) -> Self {
        QuoteError::Transport(e)
    }
}

impl From<NormalizeError> for QuoteError {
    fn from(e: NormalizeError) -> Self {
        QuoteError::Decode(e)
    }
}
