//! Market Window Aggregator
//!
//! Reduces a recorded market data feed, one window (minute) at a time, into:
//! - Bid/ask/mid candles from best bid/ask tickers
//! - Trade candles, market volumes and volume-weighted prices
//! - Percentage-distance volume profiles of a bounded order book mirror
//!
//! Deterministic: the same feed replayed into a fresh aggregator yields the
//! same records and the same book checksums.
//!
//! # Architecture
//!
//! ```text
//!   UpdateFeed (JSON lines)
//!          │
//!    ┌─────▼──────┐
//!    │ Aggregator │  ← dispatches by document type
//!    └─────┬──────┘
//!          │
//!   ┌──────┼───────────────┐
//!   │      │               │
//! ┌─▼───┐ ┌▼──────┐  ┌─────▼─────┐
//! │Book │ │Trade  │  │OrderBook  │──► LevelGrouper
//! │tick │ │tick   │  │Engine     │
//! └─┬───┘ └┬──────┘  └─────┬─────┘
//!   │      │               │
//! ┌─▼──────▼───────────────▼──┐
//! │   ProfileSink (per kind)  │──► CsvExporter
//! └───────────────────────────┘
//! ```

pub mod config;
pub mod events;
pub mod export;
pub mod feed;
pub mod grouping;
pub mod order_book;
pub mod pipeline;
pub mod price_level;
pub mod snapshot;
pub mod store;
pub mod tickers;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
