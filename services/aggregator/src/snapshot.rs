//! Checksummed book snapshots
//!
//! Captures both sides of an [`OrderBookEngine`] in storage order and tags
//! them with a SHA-256 checksum, so two replays of the same feed can be
//! compared cheaply and a stored snapshot can be verified after reload.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::order_book::OrderBookEngine;
use crate::price_level::PriceLevel;

/// A copy of the full book at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels, worst → best (ascending price).
    pub bids: Vec<PriceLevel>,
    /// Ask levels, worst → best (descending price).
    pub asks: Vec<PriceLevel>,
    pub max_depth: usize,
    /// SHA-256 checksum of the level content.
    pub checksum: String,
}

impl BookSnapshot {
    pub fn capture(book: &OrderBookEngine) -> Self {
        let bids = book.bids().levels();
        let asks = book.asks().levels();
        let checksum = compute_checksum(&bids, &asks);

        Self {
            bids,
            asks,
            max_depth: book.max_depth(),
            checksum,
        }
    }

    pub fn level_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

/// Compute a SHA-256 checksum over both sides.
///
/// Decimals are normalized first so "1.10" and "1.1" hash the same.
pub fn compute_checksum(bids: &[PriceLevel], asks: &[PriceLevel]) -> String {
    let mut hasher = Sha256::new();

    for side in [bids, asks] {
        for level in side {
            hasher.update(level.price.as_decimal().normalize().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(level.volume.as_decimal().normalize().to_string().as_bytes());
            hasher.update(b"|");
        }
        hasher.update(b"---");
    }

    format!("{:x}", hasher.finalize())
}

/// Verify that a snapshot's checksum matches its content.
pub fn verify_snapshot_integrity(snapshot: &BookSnapshot) -> bool {
    snapshot.checksum == compute_checksum(&snapshot.bids, &snapshot.asks)
}
