//! Fixed-point decimal types for prices and volumes
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Feeds deliver prices and volumes as decimal strings, so both types parse
//! from text and report failures as [`NumericError`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::NumericError;

/// Parse a decimal from feed text, accepting plain and scientific notation.
pub fn parse_decimal(input: &str) -> Result<Decimal, NumericError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| NumericError::Invalid {
            input: input.to_string(),
        })
}

/// A price point. Signed: spreads and synthetic instruments can go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s).map(Self)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resting volume at a price level. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Volume(Decimal);

impl Volume {
    pub const ZERO: Volume = Volume(Decimal::ZERO);

    /// Create a volume, returning None for negative values.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// A zero volume on the wire means "remove this level".
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Volume {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or(NumericError::Negative { value })
    }
}

impl From<Volume> for Decimal {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl FromStr for Volume {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(parse_decimal(s)?)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain_and_scientific() {
        assert_eq!(parse_decimal("1.19").unwrap(), Decimal::new(119, 2));
        assert_eq!(parse_decimal(" 42 ").unwrap(), Decimal::from(42));
        assert_eq!(parse_decimal("1e-2").unwrap(), Decimal::new(1, 2));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_decimal("abc").unwrap_err();
        assert_eq!(
            err,
            NumericError::Invalid {
                input: "abc".to_string()
            }
        );
        assert!(parse_decimal("").is_err());
    }

    #[test]
    fn test_price_allows_negative() {
        let price: Price = "-0.5".parse().unwrap();
        assert_eq!(price.as_decimal(), Decimal::new(-5, 1));
    }

    #[test]
    fn test_price_ordering_ignores_scale() {
        let a: Price = "1.10".parse().unwrap();
        let b: Price = "1.1".parse().unwrap();
        assert_eq!(a, b);
        assert!(Price::from(Decimal::ONE) < a);
    }

    #[test]
    fn test_volume_rejects_negative() {
        assert!(Volume::try_new(Decimal::from(-1)).is_none());
        assert!(matches!(
            "-3".parse::<Volume>(),
            Err(NumericError::Negative { .. })
        ));
    }

    #[test]
    fn test_volume_zero_detection() {
        let zero: Volume = "0.000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Volume::ZERO);
        let some: Volume = "0.001".parse().unwrap();
        assert!(!some.is_zero());
    }

    #[test]
    fn test_volume_deserialization_validates() {
        let ok: Volume = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.as_decimal(), Decimal::new(125, 1));
        assert!(serde_json::from_str::<Volume>("\"-1\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(mantissa in -1_000_000_000i64..1_000_000_000, scale in 0u32..12) {
            let value = Decimal::new(mantissa, scale);
            let price: Price = Price::from(value).to_string().parse().unwrap();
            prop_assert_eq!(price.as_decimal(), value);

            let volume = Volume::try_new(value.abs()).unwrap();
            let parsed: Volume = volume.to_string().parse().unwrap();
            prop_assert_eq!(parsed, volume);
        }
    }
}
