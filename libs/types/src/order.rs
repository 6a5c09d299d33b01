//! Book side convention
//!
//! A side decides both which end of the price axis is "best" and the
//! direction in which levels move away from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Resting buy interest; best is the highest price
    Bid,
    /// Resting sell interest; best is the lowest price
    Ask,
}

impl Side {
    /// True if `a` is a strictly better price than `b` on this side.
    pub fn is_better<T: PartialOrd>(&self, a: &T, b: &T) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
