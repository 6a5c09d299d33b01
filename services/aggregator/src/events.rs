//! Feed documents consumed and records produced by the aggregator
//!
//! Every feed document covers one time window (`minute_utc`) of one kind of
//! market data. The `type` field selects the payload:
//!
//! ```json
//! {"minute_utc": 27000000, "type": "BOOK_TICKER", "tickers": [{"bid": 1.19, "ask": 1.2}]}
//! {"minute_utc": 27000000, "type": "TRADE_TICKER", "tickers": [{"price": 1.2, "qty": 5, "is_market_maker": false}]}
//! {"minute_utc": 27000000, "type": "ORDER_BOOK", "updates": [{"bids": [["1.19", "200"]], "asks": [["1.3", "0"]]}]}
//! ```
//!
//! Each document reduces to one [`AggregateRecord`] tagged with the same
//! window, written to the collection for its kind.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::MarketId;

use crate::order_book::WireUpdate;
use crate::tickers::Ohlc;

/// One window of raw market data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDocument {
    /// Window start, in minutes since the Unix epoch.
    pub minute_utc: i64,
    /// Instrument the window belongs to, when the feed records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<MarketId>,
    #[serde(flatten)]
    pub payload: FeedPayload,
}

/// Kind-specific payload of a [`FeedDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedPayload {
    /// Best bid/ask snapshots observed during the window.
    BookTicker { tickers: Vec<BookTick> },
    /// Trade prints observed during the window.
    TradeTicker { tickers: Vec<TradeTick> },
    /// Order book diff batch accumulated during the window.
    OrderBook { updates: Vec<WireUpdate> },
}

impl FeedDocument {
    /// Document kind as a label for logging.
    pub fn kind_label(&self) -> &'static str {
        match &self.payload {
            FeedPayload::BookTicker { .. } => "BOOK_TICKER",
            FeedPayload::TradeTicker { .. } => "TRADE_TICKER",
            FeedPayload::OrderBook { .. } => "ORDER_BOOK",
        }
    }
}

/// A best bid/ask observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTick {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl BookTick {
    /// `(bid + ask) / 2`, `None` if the sum leaves the `Decimal` range.
    pub fn mid(&self) -> Option<Decimal> {
        Some(self.bid.checked_add(self.ask)? / Decimal::TWO)
    }
}

/// A trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTick {
    pub price: Decimal,
    pub qty: Decimal,
    /// True when the buyer was the maker, i.e. the trade was a market sell.
    pub is_market_maker: bool,
}

/// Reduced best bid/ask window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTickerMinute {
    pub minute_utc: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<MarketId>,
    pub bid: Ohlc,
    pub ask: Ohlc,
    pub mid: Ohlc,
}

/// Reduced trade window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTickerMinute {
    pub minute_utc: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<MarketId>,
    pub market_sell_vol: Decimal,
    pub market_buy_vol: Decimal,
    /// `None` when the window saw no market sells.
    pub weighted_sell_price: Option<Decimal>,
    /// `None` when the window saw no market buys.
    pub weighted_buy_price: Option<Decimal>,
    pub candle: Option<Ohlc>,
    pub trade_count: u64,
}

/// Volume profile of the book as it stood at the end of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookMinute {
    pub minute_utc: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<MarketId>,
    /// Bid buckets, nearest the best bid first.
    pub bids: Vec<Decimal>,
    /// Ask buckets, nearest the best ask first.
    pub asks: Vec<Decimal>,
    /// Checksum of the book the profile was grouped from.
    pub book_checksum: String,
}

/// Output of reducing one feed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateRecord {
    BookTicker(BookTickerMinute),
    TradeTicker(TradeTickerMinute),
    OrderBook(OrderBookMinute),
}

impl AggregateRecord {
    pub fn minute_utc(&self) -> i64 {
        match self {
            AggregateRecord::BookTicker(r) => r.minute_utc,
            AggregateRecord::TradeTicker(r) => r.minute_utc,
            AggregateRecord::OrderBook(r) => r.minute_utc,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            AggregateRecord::BookTicker(_) => RecordKind::BookTicker,
            AggregateRecord::TradeTicker(_) => RecordKind::TradeTicker,
            AggregateRecord::OrderBook(_) => RecordKind::OrderBook,
        }
    }
}

/// Record kinds; each is stored in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    BookTicker,
    TradeTicker,
    OrderBook,
}

impl RecordKind {
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::BookTicker,
            RecordKind::TradeTicker,
            RecordKind::OrderBook,
        ]
    }

    /// Suffix appended to the collection name for this kind's records.
    pub fn collection_suffix(&self) -> &'static str {
        match self {
            RecordKind::BookTicker => "BookTickerMinutes",
            RecordKind::TradeTicker => "TradeTickerMinutes",
            RecordKind::OrderBook => "OrderBookMinutes",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_book_ticker_document() {
        let json = r#"{"_id": "abc", "minute_utc": 27000000, "type": "BOOK_TICKER",
                       "symbol": "BTCUSDT", "tickers": [{"bid": 1.19, "ask": 1.2}]}"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.minute_utc, 27000000);
        assert_eq!(doc.symbol, Some(MarketId::try_new("BTCUSDT").unwrap()));
        assert_eq!(doc.kind_label(), "BOOK_TICKER");
        match doc.payload {
            FeedPayload::BookTicker { tickers } => {
                assert_eq!(tickers.len(), 1);
                assert_eq!(tickers[0].bid, dec("1.19"));
                assert_eq!(tickers[0].mid(), Some(dec("1.195")));
            }
            other => panic!("Expected BookTicker, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_trade_ticker_document() {
        let json = r#"{"minute_utc": 1, "type": "TRADE_TICKER",
                       "tickers": [{"price": "30000.5", "qty": 0.25, "is_market_maker": true}]}"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();

        assert!(doc.symbol.is_none());
        match doc.payload {
            FeedPayload::TradeTicker { tickers } => {
                assert_eq!(tickers[0].price, dec("30000.5"));
                assert_eq!(tickers[0].qty, dec("0.25"));
                assert!(tickers[0].is_market_maker);
            }
            other => panic!("Expected TradeTicker, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_order_book_document() {
        let json = r#"{"minute_utc": 2, "type": "ORDER_BOOK",
                       "updates": [{"bids": [["1.1", "100"]], "asks": [["1.3", "0"]]}]}"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();

        match doc.payload {
            FeedPayload::OrderBook { updates } => {
                assert_eq!(updates.len(), 1);
                assert_eq!(updates[0].asks[0][1], "0");
            }
            other => panic!("Expected OrderBook, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_document_type_rejected() {
        let json = r#"{"minute_utc": 2, "type": "FUNDING_RATE", "rate": 0.01}"#;
        assert!(serde_json::from_str::<FeedDocument>(json).is_err());
    }

    #[test]
    fn test_record_serialization_roundtrip() {
        let record = AggregateRecord::TradeTicker(TradeTickerMinute {
            minute_utc: 42,
            symbol: Some(MarketId::try_new("ETHUSDT").unwrap()),
            market_sell_vol: Decimal::ZERO,
            market_buy_vol: dec("3"),
            weighted_sell_price: None,
            weighted_buy_price: Some(dec("2000.5")),
            candle: Some(Ohlc::new(dec("2000.5"))),
            trade_count: 1,
        });

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"TRADE_TICKER\""));
        assert!(json.contains("\"weighted_sell_price\":null"));

        let deserialized: AggregateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
        assert_eq!(deserialized.minute_utc(), 42);
        assert_eq!(deserialized.kind(), RecordKind::TradeTicker);
    }

    #[test]
    fn test_collection_suffixes_distinct() {
        let suffixes: Vec<&str> = RecordKind::all()
            .iter()
            .map(RecordKind::collection_suffix)
            .collect();
        assert_eq!(
            suffixes,
            vec!["BookTickerMinutes", "TradeTickerMinutes", "OrderBookMinutes"]
        );
    }
}
