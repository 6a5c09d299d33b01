//! Types library for the market window aggregator
//!
//! This library provides the core type definitions shared by the
//! aggregation services, keeping price arithmetic deterministic and the
//! error taxonomy in one place.
//!
//! # Modules
//! - `ids`: Instrument identifiers (MarketId)
//! - `numeric`: Decimal newtypes (Price, Volume)
//! - `order`: Book side convention
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod order;
pub mod errors;
