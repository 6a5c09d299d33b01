//! CSV export of aggregated minutes
//!
//! Joins the three record kinds on `minute_utc` into one row per minute,
//! covering every minute between the first and last record seen. Minutes
//! with no record of a kind get empty cells for that kind's columns.

use std::collections::BTreeMap;
use std::io::{self, Write};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::events::{AggregateRecord, BookTickerMinute, OrderBookMinute, TradeTickerMinute};
use crate::grouping::checked_sum;

pub const CSV_HEADER: [&str; 17] = [
    "minute_utc",
    "BookOpenMid",
    "BookHighMid",
    "BookLowMid",
    "BookCloseMid",
    "TradeOpen",
    "TradeHigh",
    "TradeLow",
    "TradeClose",
    "SellVolume",
    "BuyVolume",
    "PriceWeightedSellVolume",
    "PriceWeightedBuyVolume",
    "BookAskVolume1Pctg",
    "BookBidVolume1Pctg",
    "BookAskVolume5Pctg",
    "BookBidVolume5Pctg",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Default)]
struct MinuteRow<'a> {
    book: Option<&'a BookTickerMinute>,
    trade: Option<&'a TradeTickerMinute>,
    profile: Option<&'a OrderBookMinute>,
}

pub struct CsvExporter {
    near_buckets: usize,
}

impl CsvExporter {
    /// `near_buckets` buckets are summed into the `*5Pctg` columns.
    pub fn new(near_buckets: usize) -> Self {
        Self { near_buckets }
    }

    /// Write all records as CSV. Returns the number of data rows written.
    ///
    /// When a minute has several records of one kind, the last one wins.
    pub fn export<W: Write>(
        &self,
        records: &[AggregateRecord],
        writer: W,
    ) -> Result<usize, ExportError> {
        let mut rows: BTreeMap<i64, MinuteRow<'_>> = BTreeMap::new();
        for record in records {
            let row = rows.entry(record.minute_utc()).or_default();
            match record {
                AggregateRecord::BookTicker(r) => row.book = Some(r),
                AggregateRecord::TradeTicker(r) => row.trade = Some(r),
                AggregateRecord::OrderBook(r) => row.profile = Some(r),
            }
        }

        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(CSV_HEADER)?;

        let (Some(&first), Some(&last)) = (rows.keys().next(), rows.keys().next_back()) else {
            csv.flush()?;
            return Ok(0);
        };

        let empty = MinuteRow::default();
        let mut written = 0;
        for minute in first..=last {
            let row = rows.get(&minute).unwrap_or(&empty);
            csv.write_record(self.format_row(minute, row))?;
            written += 1;
        }
        csv.flush()?;

        info!(
            rows = written,
            first_minute = first,
            last_minute = last,
            "CSV export complete"
        );
        Ok(written)
    }

    fn format_row(&self, minute: i64, row: &MinuteRow<'_>) -> Vec<String> {
        let mut fields = Vec::with_capacity(CSV_HEADER.len());
        fields.push(minute.to_string());

        let mid = row.book.map(|b| b.mid);
        fields.push(cell(mid.map(|c| c.open)));
        fields.push(cell(mid.map(|c| c.high)));
        fields.push(cell(mid.map(|c| c.low)));
        fields.push(cell(mid.map(|c| c.close)));

        let candle = row.trade.and_then(|t| t.candle);
        fields.push(cell(candle.map(|c| c.open)));
        fields.push(cell(candle.map(|c| c.high)));
        fields.push(cell(candle.map(|c| c.low)));
        fields.push(cell(candle.map(|c| c.close)));

        fields.push(cell(row.trade.map(|t| t.market_sell_vol)));
        fields.push(cell(row.trade.map(|t| t.market_buy_vol)));
        fields.push(cell(row.trade.and_then(|t| t.weighted_sell_price)));
        fields.push(cell(row.trade.and_then(|t| t.weighted_buy_price)));

        fields.push(cell(row.profile.and_then(|p| p.asks.first().copied())));
        fields.push(cell(row.profile.and_then(|p| p.bids.first().copied())));
        fields.push(cell(row.profile.and_then(|p| self.near_sum(&p.asks))));
        fields.push(cell(row.profile.and_then(|p| self.near_sum(&p.bids))));

        fields
    }

    /// `None` (an empty cell) if the sum leaves the `Decimal` range.
    fn near_sum(&self, buckets: &[Decimal]) -> Option<Decimal> {
        checked_sum(buckets.iter().take(self.near_buckets).copied())
    }
}

fn cell(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}
