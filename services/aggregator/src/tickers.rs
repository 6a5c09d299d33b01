//! Per-window ticker reduction
//!
//! Reduces the raw ticks of one time window into candles:
//! - Book ticker windows → open/high/low/close of best bid, best ask and mid.
//! - Trade ticker windows → trade price OHLC, market sell/buy volume and
//!   volume-weighted sell/buy price.
//!
//! Uses `Decimal` for all arithmetic. A window where one side of the market
//! saw no trades has no weighted price for that side: it is reported as
//! `None`, never as zero and never as a division fault. Sums that leave the
//! `Decimal` range fail the window with `BookError::Overflow`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use types::errors::BookError;

use crate::events::{BookTick, TradeTick};

/// Open/high/low/close of one price series over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    #[serde(rename = "o")]
    pub open: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "c")]
    pub close: Decimal,
}

impl Ohlc {
    /// Start a candle from the first price in the window.
    pub fn new(price: Decimal) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Fold the next price of the window into the candle.
    pub fn update(&mut self, price: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }

    /// Build a candle over a price series; `None` if the series is empty.
    pub fn from_series<I>(prices: I) -> Option<Self>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let mut prices = prices.into_iter();
        let mut candle = Self::new(prices.next()?);
        for price in prices {
            candle.update(price);
        }
        Some(candle)
    }

    /// Validate candle integrity (OHLC invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Reduced best bid/ask window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTickerWindow {
    pub bid: Ohlc,
    pub ask: Ohlc,
    /// Candle of `(bid + ask) / 2` per tick.
    pub mid: Ohlc,
}

/// Reduce best bid/ask ticks. Returns `Ok(None)` for a window with no ticks.
pub fn reduce_book_tickers(ticks: &[BookTick]) -> Result<Option<BookTickerWindow>, BookError> {
    let mids = ticks
        .iter()
        .map(BookTick::mid)
        .collect::<Option<Vec<_>>>()
        .ok_or(BookError::Overflow { context: "mid price" })?;

    let (Some(bid), Some(ask), Some(mid)) = (
        Ohlc::from_series(ticks.iter().map(|t| t.bid)),
        Ohlc::from_series(ticks.iter().map(|t| t.ask)),
        Ohlc::from_series(mids),
    ) else {
        return Ok(None);
    };
    Ok(Some(BookTickerWindow { bid, ask, mid }))
}

/// Reduced trade print window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTickerWindow {
    /// Volume of trades where the buyer was the maker (aggressive sells).
    pub market_sell_vol: Decimal,
    /// Volume of trades where the seller was the maker (aggressive buys).
    pub market_buy_vol: Decimal,
    pub weighted_sell_price: Option<Decimal>,
    pub weighted_buy_price: Option<Decimal>,
    /// Trade price candle; `None` when the window has no trades.
    pub candle: Option<Ohlc>,
    pub trade_count: u64,
}

/// Reduce trade prints into volumes, volume-weighted prices and a candle.
pub fn reduce_trade_tickers(ticks: &[TradeTick]) -> Result<TradeTickerWindow, BookError> {
    let mut sell = VolumeAccumulator::default();
    let mut buy = VolumeAccumulator::default();

    for tick in ticks {
        if tick.is_market_maker {
            sell.add(tick.price, tick.qty)?;
        } else {
            buy.add(tick.price, tick.qty)?;
        }
    }

    Ok(TradeTickerWindow {
        market_sell_vol: sell.volume,
        market_buy_vol: buy.volume,
        weighted_sell_price: sell.weighted_price(),
        weighted_buy_price: buy.weighted_price(),
        candle: Ohlc::from_series(ticks.iter().map(|t| t.price)),
        trade_count: ticks.len() as u64,
    })
}

#[derive(Debug, Default)]
struct VolumeAccumulator {
    volume: Decimal,
    notional: Decimal,
}

impl VolumeAccumulator {
    fn add(&mut self, price: Decimal, qty: Decimal) -> Result<(), BookError> {
        let notional = qty
            .checked_mul(price)
            .and_then(|n| self.notional.checked_add(n))
            .ok_or(BookError::Overflow {
                context: "trade notional",
            })?;
        let volume = self.volume.checked_add(qty).ok_or(BookError::Overflow {
            context: "trade volume",
        })?;
        self.notional = notional;
        self.volume = volume;
        Ok(())
    }

    fn weighted_price(&self) -> Option<Decimal> {
        if self.volume.is_zero() {
            return None;
        }
        self.notional.checked_div(self.volume)
    }
}
