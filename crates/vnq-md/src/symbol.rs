//! Symbol validation and asset-type classification.
//!
//! Both are collaborators of the adapter: [`Quote`](crate::Quote) takes any
//! [`SymbolValidator`] / [`AssetClassifier`], and the defaults here encode the
//! Vietnamese exchange naming conventions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

/// Index names recognised without the `INDEX` suffix.
pub const KNOWN_INDICES: &[&str] = &[
    "VNINDEX",
    "HNXINDEX",
    "UPCOMINDEX",
    "VN30",
    "VN100",
    "HNX30",
    "VNMID",
    "VNSML",
    "VNALL",
    "VNXALL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Index,
    Derivative,
    Bond,
    #[serde(rename = "coveredwarr")]
    CoveredWarrant,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Index => "index",
            AssetType::Derivative => "derivative",
            AssetType::Bond => "bond",
            AssetType::CoveredWarrant => "coveredwarr",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Maps a normalized (upper-case) symbol to its asset type.
pub trait AssetClassifier: Send + Sync {
    /// `None` means the symbol matches no known instrument shape.
    fn classify(&self, symbol: &str) -> Option<AssetType>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAssetClassifier;

impl AssetClassifier for DefaultAssetClassifier {
    fn classify(&self, symbol: &str) -> Option<AssetType> {
        if symbol.contains("INDEX") || KNOWN_INDICES.contains(&symbol) {
            return Some(AssetType::Index);
        }
        if is_vn30_future(symbol) {
            return Some(AssetType::Derivative);
        }
        if symbol.len() == 3 {
            return Some(AssetType::Stock);
        }
        if is_bond(symbol) {
            return Some(AssetType::Bond);
        }
        if symbol.len() == 8 && symbol.starts_with('C') {
            return Some(AssetType::CoveredWarrant);
        }
        None
    }
}

/// `VN30F1M`, `VN30F2M`, `VN30F12M` or dated contracts like `VN30F2406`.
fn is_vn30_future(symbol: &str) -> bool {
    let Some(rest) = symbol.strip_prefix("VN30F") else {
        return false;
    };
    if let Some(n) = rest.strip_suffix('M') {
        return (1..=2).contains(&n.len()) && n.bytes().all(|b| b.is_ascii_digit());
    }
    rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit())
}

/// Three letters followed by five or six digits.
fn is_bond(symbol: &str) -> bool {
    let b = symbol.as_bytes();
    (8..=9).contains(&b.len())
        && b[..3].iter().all(|c| c.is_ascii_alphabetic())
        && b[3..].iter().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

pub trait SymbolValidator: Send + Sync {
    /// Returns the normalized symbol or `QuoteError::InvalidSymbol`.
    fn validate(&self, symbol: &str) -> Result<String, QuoteError>;
}

/// Trim, length and charset checks, upper-casing, then a classifier lookup.
#[derive(Clone)]
pub struct DefaultSymbolValidator {
    classifier: Arc<dyn AssetClassifier>,
}

impl DefaultSymbolValidator {
    pub fn new(classifier: Arc<dyn AssetClassifier>) -> Self {
        Self { classifier }
    }
}

impl Default for DefaultSymbolValidator {
    fn default() -> Self {
        Self::new(Arc::new(DefaultAssetClassifier))
    }
}

impl fmt::Debug for DefaultSymbolValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSymbolValidator").finish_non_exhaustive()
    }
}

impl SymbolValidator for DefaultSymbolValidator {
    fn validate(&self, symbol: &str) -> Result<String, QuoteError> {
        let invalid = |reason: &str| QuoteError::InvalidSymbol {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        let s = symbol.trim();
        if s.is_empty() {
            return Err(invalid("symbol is empty"));
        }
        if !(3..=10).contains(&s.len()) {
            return Err(invalid("symbol must be 3 to 10 characters"));
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(invalid("symbol must be ASCII letters and digits"));
        }

        let upper = s.to_ascii_uppercase();
        if self.classifier.classify(&upper).is_none() {
            return Err(invalid("symbol does not match any known instrument type"));
        }
        Ok(upper)
    }
}
