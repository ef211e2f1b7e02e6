#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use depth_profiler::api::{ApiError, MarketDataSource};
use depth_profiler::market::{BookLevel, OrderBook, Ticker24hr, Trade};
use depth_profiler::volume_profile::{ResolvedAssetConfig, VolumeProfileConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Order book with `depth` levels per side spaced `tick` apart around `mid`
pub fn create_sample_book(symbol: &str, mid: f64, depth: usize, tick: f64, seed: u64) -> OrderBook {
    let mut rng = StdRng::seed_from_u64(seed);
    let bids = (1..=depth)
        .map(|i| BookLevel::new(mid - i as f64 * tick, rng.gen_range(0.1..5.1)))
        .collect();
    let asks = (1..=depth)
        .map(|i| BookLevel::new(mid + i as f64 * tick, rng.gen_range(0.1..5.1)))
        .collect();
    OrderBook::new(symbol, seed, bids, asks)
}

pub fn create_sample_trades(center: f64, count: usize, seed: u64) -> Vec<Trade> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| Trade {
            price: center * (1.0 + rng.gen_range(-0.02..0.02)),
            quantity: rng.gen_range(0.01..1.01),
            is_buyer_maker: rng.gen_bool(0.5),
            time: 1_700_000_000_000 + i as i64,
        })
        .collect()
}

pub fn create_sample_ticker(symbol: &str, price: f64, quote_volume: f64) -> Ticker24hr {
    Ticker24hr {
        symbol: symbol.to_string(),
        last_price: price,
        price_change_percent: 0.8,
        volume: quote_volume / price,
        quote_volume,
    }
}

pub fn default_resolved_config() -> ResolvedAssetConfig {
    VolumeProfileConfig::default().resolve_for_asset("BTCUSDT")
}

/// Data source serving canned responses and counting requests
pub struct ScriptedSource {
    pub book: Option<OrderBook>,
    pub ticker: Option<Ticker24hr>,
    /// Quote volume per ticker call, the last entry repeats
    pub quote_volumes: Vec<f64>,
    pub depth_latency: Duration,
    pub depth_calls: AtomicUsize,
    pub ticker_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn healthy(book: OrderBook, ticker: Ticker24hr) -> Self {
        Self {
            book: Some(book),
            ticker: Some(ticker),
            quote_volumes: Vec::new(),
            depth_latency: Duration::ZERO,
            depth_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            book: None,
            ticker: None,
            quote_volumes: Vec::new(),
            depth_latency: Duration::ZERO,
            depth_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_quote_volumes(mut self, volumes: Vec<f64>) -> Self {
        self.quote_volumes = volumes;
        self
    }

    pub fn with_depth_latency(mut self, latency: Duration) -> Self {
        self.depth_latency = latency;
        self
    }

    pub fn depth_calls(&self) -> usize {
        self.depth_calls.load(Ordering::SeqCst)
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_depth(&self, _symbol: &str, _limit: u32) -> Result<OrderBook, ApiError> {
        self.depth_calls.fetch_add(1, Ordering::SeqCst);
        if !self.depth_latency.is_zero() {
            tokio::time::sleep(self.depth_latency).await;
        }
        self.book.clone().ok_or_else(|| ApiError::Network("offline".to_string()))
    }

    async fn fetch_ticker(&self, _symbol: &str) -> Result<Ticker24hr, ApiError> {
        let call = self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        let mut ticker = self.ticker.clone().ok_or_else(|| ApiError::Network("offline".to_string()))?;
        if let Some(volume) = self.quote_volumes.get(call).or(self.quote_volumes.last()) {
            ticker.quote_volume = *volume;
            ticker.volume = *volume / ticker.last_price;
        }
        Ok(ticker)
    }

    async fn fetch_recent_trades(&self, _symbol: &str, _limit: u32) -> Result<Vec<Trade>, ApiError> {
        Err(ApiError::Network("offline".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
