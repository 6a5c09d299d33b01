//! Percentage-distance volume profile
//!
//! Walks each side of the book outward from its best price and sums
//! volume into buckets whose width is a fixed fraction of the midpoint:
//!
//! ```text
//! width = percentage_interval * (best_bid + best_ask) / 2
//!
//! bids (best → worst)   1.19 1.18 1.17 | 1.16 1.15 | 1.10
//!                       └── bucket 0 ──┘ └ bucket 1 ┘ └ 2 ┘
//! ```
//!
//! Each bucket is anchored at the first level not yet consumed; following
//! levels join it while they stay strictly within `width` of the anchor.
//! The first level at or beyond that distance closes the bucket and
//! anchors the next one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use types::errors::BookError;
use types::order::Side;

use crate::order_book::OrderBookEngine;
use crate::price_level::{PriceLevel, PriceLevelStore};

/// Volume grouped by distance from the best price, nearest bucket first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub bid_buckets: Vec<Decimal>,
    pub ask_buckets: Vec<Decimal>,
}

impl VolumeProfile {
    /// Buckets for the given side.
    pub fn buckets(&self, side: Side) -> &[Decimal] {
        match side {
            Side::Bid => &self.bid_buckets,
            Side::Ask => &self.ask_buckets,
        }
    }

    /// Sum of the `n` buckets nearest the best price, `None` on overflow.
    pub fn near_volume(&self, side: Side, n: usize) -> Option<Decimal> {
        checked_sum(self.buckets(side).iter().take(n).copied())
    }
}

/// Groups book levels into a [`VolumeProfile`] for a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGrouper {
    percentage_interval: Decimal,
}

impl LevelGrouper {
    /// `percentage_interval` is a fraction of the midpoint, e.g. 0.01 for 1%.
    pub fn new(percentage_interval: Decimal) -> Result<Self, BookError> {
        if percentage_interval <= Decimal::ZERO {
            return Err(BookError::InvalidInterval {
                interval: percentage_interval,
            });
        }

        info!(%percentage_interval, "LevelGrouper initialized");

        Ok(Self {
            percentage_interval,
        })
    }

    pub fn percentage_interval(&self) -> Decimal {
        self.percentage_interval
    }

    /// Group the current state of `book`.
    pub fn group(&self, book: &OrderBookEngine) -> Result<VolumeProfile, BookError> {
        self.group_stores(book.bids(), book.asks())
    }

    /// Group a bid store and an ask store.
    ///
    /// Fails with `BookEmpty` if either side has no levels, since no
    /// midpoint exists.
    pub fn group_stores(
        &self,
        bids: &PriceLevelStore,
        asks: &PriceLevelStore,
    ) -> Result<VolumeProfile, BookError> {
        let best_bid = bids.best().ok_or(BookError::BookEmpty { side: Side::Bid })?;
        let best_ask = asks.best().ok_or(BookError::BookEmpty { side: Side::Ask })?;

        let mid = best_bid
            .price
            .as_decimal()
            .checked_add(best_ask.price.as_decimal())
            .ok_or(BookError::Overflow { context: "midpoint" })?
            / Decimal::TWO;
        let width = self
            .percentage_interval
            .checked_mul(mid)
            .ok_or(BookError::Overflow {
                context: "bucket width",
            })?;

        Ok(VolumeProfile {
            bid_buckets: bucket_side(bids.levels_from_best(), Side::Bid, width)?,
            ask_buckets: bucket_side(asks.levels_from_best(), Side::Ask, width)?,
        })
    }
}

/// Bucket levels given best → worst.
///
/// The anchor always lands in its own bucket, so a non-positive width
/// (midpoint at or below zero) yields one bucket per level.
fn bucket_side<I>(levels: I, side: Side, width: Decimal) -> Result<Vec<Decimal>, BookError>
where
    I: Iterator<Item = PriceLevel>,
{
    let mut buckets = Vec::new();
    let mut levels = levels.peekable();

    while let Some(anchor) = levels.next() {
        let anchor_price = anchor.price.as_decimal();
        let threshold = match side {
            Side::Bid => anchor_price.checked_sub(width),
            Side::Ask => anchor_price.checked_add(width),
        }
        .ok_or(BookError::Overflow {
            context: "bucket boundary",
        })?;

        let mut summed = anchor.volume.as_decimal();
        while let Some(level) =
            levels.next_if(|l| side.is_better(&l.price.as_decimal(), &threshold))
        {
            summed = summed
                .checked_add(level.volume.as_decimal())
                .ok_or(BookError::Overflow {
                    context: "bucket volume",
                })?;
        }
        buckets.push(summed);
    }

    Ok(buckets)
}

/// Sum of decimals, `None` if the total leaves the `Decimal` range.
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}
