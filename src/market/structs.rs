use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch
pub type TimestampMS = i64;

/// Single order book level (price, quantity in base asset)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

impl BookLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    /// Quote-denominated value resting at this level
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Finite price and strictly positive, finite quantity
    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.quantity.is_finite() && self.quantity > 0.0
    }
}

/// Full order book snapshot for one symbol
///
/// Both sides are kept in the order the exchange delivered them; nothing
/// downstream relies on that ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub last_update_id: u64,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>, last_update_id: u64, bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self {
            symbol: symbol.into(),
            last_update_id,
            bids,
            asks,
        }
    }

    /// Highest bid price
    pub fn best_bid(&self) -> Option<f64> {
        self.bids
            .iter()
            .filter(|level| level.is_usable() && level.price > 0.0)
            .map(|level| level.price)
            .reduce(f64::max)
    }

    /// Lowest ask price
    pub fn best_ask(&self) -> Option<f64> {
        self.asks
            .iter()
            .filter(|level| level.is_usable() && level.price > 0.0)
            .map(|level| level.price)
            .reduce(f64::min)
    }

    /// Mid price between best bid and best ask, if both sides are present
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Executed trade from the public tape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub quantity: f64,
    /// True when the buyer was the resting order, i.e. the aggressor sold
    pub is_buyer_maker: bool,
    pub time: TimestampMS,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.quantity.is_finite() && self.quantity > 0.0
    }
}
