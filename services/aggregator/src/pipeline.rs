//! Aggregation pipeline
//!
//! Pulls feed documents in order and reduces each one to an
//! [`AggregateRecord`]:
//!
//! - `BOOK_TICKER` → bid/ask/mid candles, skipped when the window is empty.
//! - `TRADE_TICKER` → trade candle, market volumes and weighted prices.
//! - `ORDER_BOOK` → diff batch applied to the book, then the book grouped
//!   into a volume profile.
//!
//! Data problems in a single window (empty book side, malformed diff batch,
//! arithmetic overflow) are logged, counted and skipped. Feed and sink
//! failures abort the run.

use std::time::Instant;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use types::errors::BookError;
use types::ids::MarketId;

use crate::events::{
    AggregateRecord, BookTickerMinute, FeedDocument, FeedPayload, OrderBookMinute,
    TradeTickerMinute,
};
use crate::feed::{FeedError, UpdateFeed};
use crate::grouping::LevelGrouper;
use crate::order_book::{OrderBookEngine, WireUpdate};
use crate::store::{ProfileSink, SinkError};
use crate::tickers::{reduce_book_tickers, reduce_trade_tickers};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Book error: {0}")]
    Book(#[from] BookError),
}

/// Counters collected over one run.
///
/// Only counts; replaying the same feed yields equal stats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub documents_read: u64,
    pub book_ticker_windows: u64,
    pub trade_ticker_windows: u64,
    pub order_book_windows: u64,
    pub records_written: u64,
    /// Book ticker windows with no ticks.
    pub empty_windows_skipped: u64,
    /// Order book windows where one side of the book was empty.
    pub profiles_skipped: u64,
    /// Order book windows whose diff batch was malformed.
    pub batches_rejected: u64,
    /// Windows whose values overflowed a `Decimal` sum or product.
    pub overflow_skipped: u64,
}

/// Drives one instrument's feed into a sink.
pub struct Aggregator<F, S> {
    feed: F,
    sink: S,
    book: OrderBookEngine,
    grouper: LevelGrouper,
    progress_every: u64,
    stats: PipelineStats,
}

impl<F: UpdateFeed, S: ProfileSink> Aggregator<F, S> {
    pub fn new(
        feed: F,
        sink: S,
        max_depth: usize,
        percentage_interval: Decimal,
    ) -> Result<Self, BookError> {
        Ok(Self {
            feed,
            sink,
            book: OrderBookEngine::new(max_depth)?,
            grouper: LevelGrouper::new(percentage_interval)?,
            progress_every: 0,
            stats: PipelineStats::default(),
        })
    }

    /// Log progress every `n` documents; 0 disables.
    pub fn with_progress_every(mut self, n: u64) -> Self {
        self.progress_every = n;
        self
    }

    /// Consume the whole feed.
    pub fn run(&mut self) -> Result<PipelineStats, PipelineError> {
        let start = Instant::now();
        info!("Starting aggregation run");

        while let Some(document) = self.feed.next_document() {
            let document = document?;
            self.stats.documents_read += 1;

            let minute_utc = document.minute_utc;
            let reduced = match self.reduce(document) {
                Ok(reduced) => reduced,
                Err(err @ BookError::Overflow { .. }) => {
                    self.stats.overflow_skipped += 1;
                    warn!(minute_utc, error = %err, "Window skipped");
                    None
                }
                Err(err) => return Err(err.into()),
            };

            if let Some(record) = reduced {
                self.sink.write(&record)?;
                self.stats.records_written += 1;
            }

            if self.progress_every > 0 && self.stats.documents_read % self.progress_every == 0 {
                info!(
                    documents = self.stats.documents_read,
                    records = self.stats.records_written,
                    bid_levels = self.book.bids().len(),
                    ask_levels = self.book.asks().len(),
                    "Aggregation progress"
                );
            }
        }

        self.sink.flush()?;

        info!(
            documents = self.stats.documents_read,
            records = self.stats.records_written,
            empty_windows_skipped = self.stats.empty_windows_skipped,
            profiles_skipped = self.stats.profiles_skipped,
            batches_rejected = self.stats.batches_rejected,
            overflow_skipped = self.stats.overflow_skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "Aggregation run complete"
        );

        Ok(self.stats.clone())
    }

    /// Reduce one document. `Ok(None)` means the window was skipped.
    fn reduce(&mut self, document: FeedDocument) -> Result<Option<AggregateRecord>, BookError> {
        let FeedDocument {
            minute_utc,
            symbol,
            payload,
        } = document;

        match payload {
            FeedPayload::BookTicker { tickers } => {
                self.stats.book_ticker_windows += 1;
                match reduce_book_tickers(&tickers)? {
                    Some(window) => Ok(Some(AggregateRecord::BookTicker(BookTickerMinute {
                        minute_utc,
                        symbol,
                        bid: window.bid,
                        ask: window.ask,
                        mid: window.mid,
                    }))),
                    None => {
                        self.stats.empty_windows_skipped += 1;
                        debug!(minute_utc, "Empty book ticker window skipped");
                        Ok(None)
                    }
                }
            }
            FeedPayload::TradeTicker { tickers } => {
                self.stats.trade_ticker_windows += 1;
                let window = reduce_trade_tickers(&tickers)?;
                Ok(Some(AggregateRecord::TradeTicker(TradeTickerMinute {
                    minute_utc,
                    symbol,
                    market_sell_vol: window.market_sell_vol,
                    market_buy_vol: window.market_buy_vol,
                    weighted_sell_price: window.weighted_sell_price,
                    weighted_buy_price: window.weighted_buy_price,
                    candle: window.candle,
                    trade_count: window.trade_count,
                })))
            }
            FeedPayload::OrderBook { updates } => {
                self.stats.order_book_windows += 1;
                self.reduce_order_book(minute_utc, symbol, &updates)
            }
        }
    }

    fn reduce_order_book(
        &mut self,
        minute_utc: i64,
        symbol: Option<MarketId>,
        updates: &[WireUpdate],
    ) -> Result<Option<AggregateRecord>, BookError> {
        match self.book.apply_wire(updates) {
            Ok(_) => {}
            Err(err @ BookError::MalformedUpdate { .. }) => {
                self.stats.batches_rejected += 1;
                warn!(minute_utc, error = %err, "Skipping window with malformed diff batch");
                return Ok(None);
            }
            Err(err) => return Err(err),
        }

        match self.grouper.group(&self.book) {
            Ok(profile) => Ok(Some(AggregateRecord::OrderBook(OrderBookMinute {
                minute_utc,
                symbol,
                bids: profile.bid_buckets,
                asks: profile.ask_buckets,
                book_checksum: self.book.snapshot().checksum,
            }))),
            Err(BookError::BookEmpty { side }) => {
                self.stats.profiles_skipped += 1;
                warn!(minute_utc, %side, "Book side empty, profile skipped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn book(&self) -> &OrderBookEngine {
        &self.book
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
