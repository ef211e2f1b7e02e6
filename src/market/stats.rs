use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::structs::TimestampMS;

/// Parsed 24h rolling ticker for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker24hr {
    pub symbol: String,
    pub last_price: f64,
    pub price_change_percent: f64,
    /// Base asset volume
    pub volume: f64,
    /// Quote asset volume (0 when the venue does not report it)
    pub quote_volume: f64,
}

impl Ticker24hr {
    /// Quote-denominated 24h volume, estimated from base volume when missing
    pub fn quote_volume_or_estimate(&self) -> f64 {
        if self.quote_volume > 0.0 {
            self.quote_volume
        } else {
            self.volume * self.last_price
        }
    }
}

/// Market statistics shown next to a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub symbol: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    /// 24h volume in quote currency
    pub volume_24h: f64,
    /// Percent change of `volume_24h` since the previous observation
    pub volume_change_24h: f64,
    pub updated_at: TimestampMS,
}

impl MarketStats {
    /// Build stats from a ticker, recording its volume in `tracker`
    pub fn from_ticker(ticker: &Ticker24hr, tracker: &mut VolumeChangeTracker, updated_at: TimestampMS) -> Self {
        let volume_24h = ticker.quote_volume_or_estimate();
        let volume_change_24h = tracker.observe(&ticker.symbol, volume_24h);

        Self {
            symbol: ticker.symbol.clone(),
            current_price: ticker.last_price,
            price_change_24h: ticker.price_change_percent,
            volume_24h,
            volume_change_24h,
            updated_at,
        }
    }
}

/// Last observed 24h volume per symbol
///
/// Owned by whoever drives the refresh loop; each call site passes its own
/// tracker so there is no process-wide state.
#[derive(Debug, Clone, Default)]
pub struct VolumeChangeTracker {
    previous: FxHashMap<String, f64>,
}

impl VolumeChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percent change against the previous observation for `symbol`
    ///
    /// The first observation reports 0. Non-positive volumes are reported
    /// against the previous value but never recorded.
    pub fn observe(&mut self, symbol: &str, current_volume: f64) -> f64 {
        let previous = self.previous.get(symbol).copied().unwrap_or(current_volume);
        let change = if previous > 0.0 {
            (current_volume - previous) / previous * 100.0
        } else {
            0.0
        };

        if current_volume > 0.0 {
            self.previous.insert(symbol.to_string(), current_volume);
        }

        debug!("Volume change for {}: {:.2}% (prev {:.2}, now {:.2})", symbol, change, previous, current_volume);
        change
    }

    pub fn previous(&self, symbol: &str) -> Option<f64> {
        self.previous.get(symbol).copied()
    }

    pub fn forget(&mut self, symbol: &str) {
        self.previous.remove(symbol);
    }
}
