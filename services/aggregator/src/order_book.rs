//! Order book engine
//!
//! Maintains one bid and one ask [`PriceLevelStore`] from batches of
//! differential updates. All arithmetic uses `Decimal`.
//!
//! A batch is validated in full before anything is applied: either every
//! operation lands, in order, or the batch is rejected with
//! `MalformedUpdate` and the book is left untouched. Within an accepted
//! batch the last operation on a price wins.
//!
//! The engine keeps no time priority inside a level and does not check
//! feed sequence numbers; one engine tracks exactly one instrument.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::BookError;
use types::numeric::{Price, Volume};
use types::order::Side;

use crate::price_level::{PriceLevel, PriceLevelStore};
use crate::snapshot::BookSnapshot;

/// A single level change for one side of the book.
///
/// Zero volume deletes the level; positive volume inserts or overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOperation {
    pub side: Side,
    pub price: Price,
    pub volume: Decimal,
}

impl DiffOperation {
    pub fn new(side: Side, price: Price, volume: Decimal) -> Self {
        Self {
            side,
            price,
            volume,
        }
    }

    pub fn upsert(side: Side, price: Price, volume: Volume) -> Self {
        Self::new(side, price, volume.as_decimal())
    }

    pub fn delete(side: Side, price: Price) -> Self {
        Self::new(side, price, Decimal::ZERO)
    }
}

/// One update entry as delivered by the feed: per-side lists of
/// `[price, volume]` string pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUpdate {
    #[serde(default)]
    pub bids: Vec<[String; 2]>,
    #[serde(default)]
    pub asks: Vec<[String; 2]>,
}

/// A validated operation, ready to apply.
#[derive(Debug, Clone, Copy)]
struct CheckedOperation {
    side: Side,
    price: Price,
    volume: Volume,
}

/// Order book for a single instrument, bounded to `max_depth` per side.
#[derive(Debug, Clone)]
pub struct OrderBookEngine {
    bids: PriceLevelStore,
    asks: PriceLevelStore,
    max_depth: usize,
    /// Batches applied since creation.
    batches_applied: u64,
    /// Levels pushed out by depth overflow since creation.
    levels_evicted: u64,
}

impl OrderBookEngine {
    /// Create an empty book keeping at most `max_depth` levels per side.
    pub fn new(max_depth: usize) -> Result<Self, BookError> {
        let bids = PriceLevelStore::new(Side::Bid, max_depth)?;
        let asks = PriceLevelStore::new(Side::Ask, max_depth)?;

        info!(max_depth, "OrderBookEngine initialized");

        Ok(Self {
            bids,
            asks,
            max_depth,
            batches_applied: 0,
            levels_evicted: 0,
        })
    }

    /// Apply a batch of diff operations in order.
    ///
    /// Rejects the whole batch, without mutating the book, if any
    /// operation carries a negative volume.
    pub fn apply(&mut self, batch: &[DiffOperation]) -> Result<(), BookError> {
        let checked = batch
            .iter()
            .enumerate()
            .map(|(index, op)| check_operation(index, op))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|err| warn!(error = %err, "Rejecting diff batch"))?;

        self.apply_checked(&checked);
        Ok(())
    }

    /// Parse and apply a batch in its wire shape.
    ///
    /// For each update entry, bids are applied before asks. Any entry with
    /// a non-numeric price or volume, or a negative volume, rejects the
    /// whole batch before mutation. Returns the number of operations applied.
    pub fn apply_wire(&mut self, updates: &[WireUpdate]) -> Result<usize, BookError> {
        let checked = parse_wire_batch(updates)
            .inspect_err(|err| warn!(error = %err, "Rejecting diff batch"))?;

        self.apply_checked(&checked);
        Ok(checked.len())
    }

    fn apply_checked(&mut self, batch: &[CheckedOperation]) {
        let mut evicted = 0u64;
        for op in batch {
            let store = match op.side {
                Side::Bid => &mut self.bids,
                Side::Ask => &mut self.asks,
            };
            if op.volume.is_zero() {
                store.delete(op.price);
            } else if store.upsert(op.price, op.volume).is_some() {
                evicted += 1;
            }
        }

        self.batches_applied += 1;
        self.levels_evicted += evicted;

        debug!(
            operations = batch.len(),
            evicted,
            bid_levels = self.bids.len(),
            ask_levels = self.asks.len(),
            "Diff batch applied"
        );
    }

    pub fn bids(&self) -> &PriceLevelStore {
        &self.bids
    }

    pub fn asks(&self) -> &PriceLevelStore {
        &self.asks
    }

    /// Store for the given side.
    pub fn side(&self, side: Side) -> &PriceLevelStore {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    /// Mid-market price (average of best bid and best ask).
    ///
    /// `None` if a side is empty or the sum leaves the `Decimal` range.
    pub fn mid_price(&self) -> Option<Decimal> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let sum = bid.price.as_decimal().checked_add(ask.price.as_decimal())?;
        Some(sum / Decimal::TWO)
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        ask.price.as_decimal().checked_sub(bid.price.as_decimal())
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn batches_applied(&self) -> u64 {
        self.batches_applied
    }

    pub fn levels_evicted(&self) -> u64 {
        self.levels_evicted
    }

    /// Checksummed copy of both sides in storage order.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot::capture(self)
    }
}

fn check_operation(index: usize, op: &DiffOperation) -> Result<CheckedOperation, BookError> {
    let volume = Volume::try_new(op.volume).ok_or_else(|| BookError::MalformedUpdate {
        index,
        reason: format!("negative volume {} at price {}", op.volume, op.price),
    })?;
    Ok(CheckedOperation {
        side: op.side,
        price: op.price,
        volume,
    })
}

fn parse_wire_batch(updates: &[WireUpdate]) -> Result<Vec<CheckedOperation>, BookError> {
    let mut checked = Vec::new();
    for update in updates {
        for (side, entries) in [(Side::Bid, &update.bids), (Side::Ask, &update.asks)] {
            for [raw_price, raw_volume] in entries {
                let index = checked.len();
                let malformed = |reason: String| BookError::MalformedUpdate { index, reason };

                let price: Price = raw_price
                    .parse()
                    .map_err(|e| malformed(format!("{side} price: {e}")))?;
                let volume: Volume = raw_volume
                    .parse()
                    .map_err(|e| malformed(format!("{side} volume: {e}")))?;

                checked.push(CheckedOperation {
                    side,
                    price,
                    volume,
                });
            }
        }
    }
    Ok(checked)
}
