//! One side of the order book: a depth-bounded set of price levels
//!
//! Levels live in a `BTreeMap` keyed by price, so lookup, insert and
//! delete are O(log n) and both ends of the side are reachable without a
//! scan. Storage order follows the side convention:
//! - Bids run worst → best (ascending price, best bid last).
//! - Asks run worst → best (descending price, best ask last).
//!
//! When an insert pushes the side past `max_depth`, the single level
//! farthest from best is evicted.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::FusedIterator;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::BookError;
use types::numeric::{Price, Volume};
use types::order::Side;

/// A single price level in the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// The price of this level.
    pub price: Price,
    /// Aggregate resting volume at this price. Always positive while stored.
    pub volume: Volume,
}

impl PriceLevel {
    pub fn new(price: Price, volume: Volume) -> Self {
        Self { price, volume }
    }
}

/// Sorted, bounded price levels for one side of a book.
#[derive(Debug, Clone)]
pub struct PriceLevelStore {
    side: Side,
    max_depth: usize,
    /// price → volume, ascending by price regardless of side.
    levels: BTreeMap<Price, Volume>,
}

impl PriceLevelStore {
    /// Create an empty store for `side` holding at most `max_depth` levels.
    pub fn new(side: Side, max_depth: usize) -> Result<Self, BookError> {
        if max_depth == 0 {
            return Err(BookError::InvalidDepth);
        }
        Ok(Self {
            side,
            max_depth,
            levels: BTreeMap::new(),
        })
    }

    /// Insert a level or overwrite the volume of an existing one.
    ///
    /// A zero volume removes the level instead of storing it. Returns the
    /// level evicted to respect `max_depth`, if any.
    pub fn upsert(&mut self, price: Price, volume: Volume) -> Option<PriceLevel> {
        if volume.is_zero() {
            self.delete(price);
            return None;
        }

        if let Some(existing) = self.levels.get_mut(&price) {
            *existing = volume;
            return None;
        }

        self.levels.insert(price, volume);
        if self.levels.len() > self.max_depth {
            self.evict_worst()
        } else {
            None
        }
    }

    /// Remove the level at `price`. Absent prices are a no-op.
    ///
    /// Returns whether a level was removed.
    pub fn delete(&mut self, price: Price) -> bool {
        self.levels.remove(&price).is_some()
    }

    /// The best-priced level: highest bid or lowest ask.
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.last_key_value(),
            Side::Ask => self.levels.first_key_value(),
        };
        entry.map(|(p, v)| PriceLevel::new(*p, *v))
    }

    /// The level farthest from best: lowest bid or highest ask.
    pub fn worst(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.first_key_value(),
            Side::Ask => self.levels.last_key_value(),
        };
        entry.map(|(p, v)| PriceLevel::new(*p, *v))
    }

    /// Volume resting at `price`, if a level exists there.
    pub fn get(&self, price: Price) -> Option<Volume> {
        self.levels.get(&price).copied()
    }

    /// Iterate levels from best to worst.
    ///
    /// The iterator borrows the store and is `Clone`, so a walk can be
    /// restarted or forked without copying the levels.
    pub fn levels_from_best(&self) -> LevelsFromBest<'_> {
        LevelsFromBest {
            inner: self.levels.iter(),
            side: self.side,
        }
    }

    /// All levels in storage order (worst → best).
    pub fn levels(&self) -> Vec<PriceLevel> {
        let mut levels: Vec<PriceLevel> = self.levels_from_best().collect();
        levels.reverse();
        levels
    }

    /// Sum of all resting volume on this side, `None` on overflow.
    pub fn total_volume(&self) -> Option<Decimal> {
        self.levels
            .values()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v.as_decimal()))
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of price levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    fn evict_worst(&mut self) -> Option<PriceLevel> {
        let evicted = match self.side {
            Side::Bid => self.levels.pop_first(),
            Side::Ask => self.levels.pop_last(),
        };
        evicted.map(|(p, v)| PriceLevel::new(p, v))
    }
}

/// Best-to-worst walk over a [`PriceLevelStore`].
#[derive(Debug, Clone)]
pub struct LevelsFromBest<'a> {
    inner: btree_map::Iter<'a, Price, Volume>,
    side: Side,
}

impl Iterator for LevelsFromBest<'_> {
    type Item = PriceLevel;

    fn next(&mut self) -> Option<Self::Item> {
        let (price, volume) = match self.side {
            Side::Bid => self.inner.next_back()?,
            Side::Ask => self.inner.next()?,
        };
        Some(PriceLevel::new(*price, *volume))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for LevelsFromBest<'_> {}

impl FusedIterator for LevelsFromBest<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn vol(s: &str) -> Volume {
        s.parse().unwrap()
    }

    fn prices(levels: &[PriceLevel]) -> Vec<Price> {
        levels.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert_eq!(
            PriceLevelStore::new(Side::Bid, 0).unwrap_err(),
            BookError::InvalidDepth
        );
    }

    #[test]
    fn test_bid_storage_order_ascending() {
        let mut bids = PriceLevelStore::new(Side::Bid, 10).unwrap();
        bids.upsert(px("1.19"), vol("200"));
        bids.upsert(px("1.1"), vol("100"));
        bids.upsert(px("1.15"), vol("50"));

        assert_eq!(
            prices(&bids.levels()),
            vec![px("1.1"), px("1.15"), px("1.19")]
        );
        assert_eq!(bids.best().unwrap().price, px("1.19"));
        assert_eq!(bids.worst().unwrap().price, px("1.1"));
    }

    #[test]
    fn test_ask_storage_order_descending() {
        let mut asks = PriceLevelStore::new(Side::Ask, 10).unwrap();
        asks.upsert(px("1.3"), vol("100"));
        asks.upsert(px("1.2"), vol("200"));
        asks.upsert(px("1.25"), vol("123"));

        assert_eq!(
            prices(&asks.levels()),
            vec![px("1.3"), px("1.25"), px("1.2")]
        );
        assert_eq!(asks.best().unwrap().price, px("1.2"));
        assert_eq!(asks.worst().unwrap().price, px("1.3"));
    }

    #[test]
    fn test_upsert_overwrites_existing_level() {
        let mut bids = PriceLevelStore::new(Side::Bid, 10).unwrap();
        bids.upsert(px("100"), vol("1"));
        bids.upsert(px("100.00"), vol("7.5"));

        assert_eq!(bids.len(), 1);
        assert_eq!(bids.get(px("100")), Some(vol("7.5")));
    }

    #[test]
    fn test_upsert_zero_volume_removes_level() {
        let mut asks = PriceLevelStore::new(Side::Ask, 10).unwrap();
        asks.upsert(px("5"), vol("1"));
        asks.upsert(px("5"), Volume::ZERO);
        assert!(asks.is_empty());

        // Zero on an absent price stores nothing
        asks.upsert(px("6"), Volume::ZERO);
        assert!(asks.is_empty());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut bids = PriceLevelStore::new(Side::Bid, 10).unwrap();
        bids.upsert(px("10"), vol("1"));
        let before = bids.levels();

        assert!(!bids.delete(px("11")));
        assert_eq!(bids.levels(), before);

        assert!(bids.delete(px("10")));
        assert!(bids.is_empty());
        assert!(bids.best().is_none());
    }

    #[test]
    fn test_bid_overflow_evicts_lowest() {
        let mut bids = PriceLevelStore::new(Side::Bid, 3).unwrap();
        bids.upsert(px("10"), vol("1"));
        bids.upsert(px("11"), vol("1"));
        bids.upsert(px("12"), vol("1"));

        let evicted = bids.upsert(px("13"), vol("1")).unwrap();
        assert_eq!(evicted.price, px("10"));
        assert_eq!(bids.len(), 3);
        assert_eq!(prices(&bids.levels()), vec![px("11"), px("12"), px("13")]);
    }

    #[test]
    fn test_ask_overflow_evicts_highest() {
        let mut asks = PriceLevelStore::new(Side::Ask, 2).unwrap();
        asks.upsert(px("20"), vol("1"));
        asks.upsert(px("21"), vol("1"));

        let evicted = asks.upsert(px("19"), vol("1")).unwrap();
        assert_eq!(evicted.price, px("21"));
        assert_eq!(prices(&asks.levels()), vec![px("20"), px("19")]);
    }

    #[test]
    fn test_insert_of_new_worst_is_evicted_immediately() {
        let mut bids = PriceLevelStore::new(Side::Bid, 2).unwrap();
        bids.upsert(px("10"), vol("1"));
        bids.upsert(px("11"), vol("1"));

        let evicted = bids.upsert(px("5"), vol("9")).unwrap();
        assert_eq!(evicted, PriceLevel::new(px("5"), vol("9")));
        assert_eq!(prices(&bids.levels()), vec![px("10"), px("11")]);
    }

    #[test]
    fn test_overwrite_at_capacity_evicts_nothing() {
        let mut asks = PriceLevelStore::new(Side::Ask, 2).unwrap();
        asks.upsert(px("20"), vol("1"));
        asks.upsert(px("21"), vol("1"));
        assert!(asks.upsert(px("21"), vol("4")).is_none());
        assert_eq!(asks.len(), 2);
    }

    #[test]
    fn test_levels_from_best_is_restartable() {
        let mut bids = PriceLevelStore::new(Side::Bid, 10).unwrap();
        for p in ["1", "3", "2"] {
            bids.upsert(px(p), vol("1"));
        }

        let walk = bids.levels_from_best();
        assert_eq!(walk.len(), 3);
        let first: Vec<Price> = walk.clone().map(|l| l.price).collect();
        let second: Vec<Price> = walk.map(|l| l.price).collect();
        assert_eq!(first, vec![px("3"), px("2"), px("1")]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_volume() {
        let mut asks = PriceLevelStore::new(Side::Ask, 10).unwrap();
        asks.upsert(px("1.2"), vol("200"));
        asks.upsert(px("1.25"), vol("123"));
        assert_eq!(asks.total_volume(), Some(Decimal::from(323)));

        asks.upsert(px("1.3"), vol("79000000000000000000000000000"));
        asks.upsert(px("1.4"), vol("79000000000000000000000000000"));
        assert_eq!(asks.total_volume(), None);
    }

    /// Straight port of the linear-scan list the store replaces, used as
    /// the reference model in property tests.
    fn model_upsert(model: &mut Vec<(Price, Volume)>, side: Side, depth: usize, p: Price, v: Volume) {
        let mut i = 0;
        let mut found = false;
        while i < model.len() {
            if model[i].0 == p {
                model[i] = (p, v);
                found = true;
                break;
            } else if side.is_better(&model[i].0, &p) {
                break;
            }
            i += 1;
        }
        if !found {
            model.insert(i, (p, v));
        }
        if model.len() > depth {
            model.remove(0);
        }
    }

    fn op_strategy() -> impl Strategy<Value = (i64, u32)> {
        // Narrow price range so updates collide often; volume 0 = delete.
        (0i64..40, 0u32..5)
    }

    proptest! {
        #[test]
        fn prop_store_matches_linear_model(
            is_bid in any::<bool>(),
            depth in 1usize..8,
            ops in proptest::collection::vec(op_strategy(), 0..120),
        ) {
            let side = if is_bid { Side::Bid } else { Side::Ask };
            let mut store = PriceLevelStore::new(side, depth).unwrap();
            let mut model: Vec<(Price, Volume)> = Vec::new();

            for (raw_price, raw_volume) in ops {
                let price = Price::new(Decimal::new(raw_price, 1));
                let volume = Volume::try_new(Decimal::from(raw_volume)).unwrap();
                if volume.is_zero() {
                    store.delete(price);
                    model.retain(|(p, _)| *p != price);
                } else {
                    store.upsert(price, volume);
                    model_upsert(&mut model, side, depth, price, volume);
                }

                prop_assert!(store.len() <= depth);
                let stored: Vec<(Price, Volume)> =
                    store.levels().iter().map(|l| (l.price, l.volume)).collect();
                prop_assert_eq!(&stored, &model);
            }
        }

        #[test]
        fn prop_storage_strictly_monotonic(
            is_bid in any::<bool>(),
            ops in proptest::collection::vec(op_strategy(), 1..80),
        ) {
            let side = if is_bid { Side::Bid } else { Side::Ask };
            let mut store = PriceLevelStore::new(side, 16).unwrap();
            for (raw_price, raw_volume) in ops {
                let price = Price::new(Decimal::from(raw_price));
                store.upsert(price, Volume::try_new(Decimal::from(raw_volume)).unwrap());
            }

            let levels = store.levels();
            for pair in levels.windows(2) {
                // Each later level is strictly better than the one before it
                prop_assert!(side.is_better(&pair[1].price, &pair[0].price));
                prop_assert!(!pair[0].volume.is_zero());
            }
            if let Some(best) = store.best() {
                prop_assert_eq!(Some(&best), levels.last());
            }
        }
    }
}
