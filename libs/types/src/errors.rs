//! Error types for the order book core
//!
//! Error taxonomy using thiserror

use rust_decimal::Decimal;
use thiserror::Error;

use crate::order::Side;

/// Order book engine and grouping errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    /// A diff operation could not be parsed or carries a negative volume.
    /// The whole batch is rejected and nothing is applied.
    #[error("Malformed update at operation {index}: {reason}")]
    MalformedUpdate { index: usize, reason: String },

    /// Grouping needs a midpoint, which needs both sides populated.
    #[error("Book empty: no {side} levels")]
    BookEmpty { side: Side },

    #[error("Invalid depth: max depth must be positive")]
    InvalidDepth,

    #[error("Invalid percentage interval: {interval} (must be positive)")]
    InvalidInterval { interval: Decimal },

    /// A sum or product of feed values left the `Decimal` range.
    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },
}

/// Decimal parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Invalid decimal: {input:?}")]
    Invalid { input: String },

    #[error("Negative volume: {value}")]
    Negative { value: Decimal },
}

/// Identifier validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Market symbol must not be blank")]
    BlankSymbol,
}
