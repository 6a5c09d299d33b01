//! Identifier types for tracked instruments
//!
//! Exchange feeds name instruments by their raw venue symbol
//! (e.g. "BTCUSDT" on Binance, "XBT/USD" on Kraken), so no format is
//! imposed beyond being non-empty.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::IdError;

/// Market identifier (instrument symbol)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    /// Try to create a MarketId, returning None if the symbol is blank
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if s.trim().is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MarketId {
    type Error = IdError;

    fn try_from(symbol: String) -> Result<Self, Self::Error> {
        Self::try_new(symbol).ok_or(IdError::BlankSymbol)
    }
}

impl From<MarketId> for String {
    fn from(id: MarketId) -> Self {
        id.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
