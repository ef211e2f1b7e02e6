use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::{BookLevel, OrderBook, Ticker24hr, TimestampMS, Trade};

/// Supported REST endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiEndpoint {
    /// Full order book snapshot
    Depth,
    /// 24hr ticker statistics
    Ticker24hr,
    /// Recent public trades
    RecentTrades,
}

impl ApiEndpoint {
    /// Get the Binance Spot API path for this endpoint
    pub fn binance_path(&self) -> &'static str {
        match self {
            ApiEndpoint::Depth => crate::common::constants::DEPTH_PATH,
            ApiEndpoint::Ticker24hr => crate::common::constants::TICKER_24HR_PATH,
            ApiEndpoint::RecentTrades => crate::common::constants::RECENT_TRADES_PATH,
        }
    }
}

/// API error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimit { retry_after_seconds: u64 },

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl ApiError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self,
            ApiError::Network(_) |
            ApiError::Timeout(_) |
            ApiError::Http(_)
        )
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimit { .. })
    }
}

/// Raw `/api/v3/depth` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshotResponse {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    /// `[price, quantity]` pairs as decimal strings
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

impl DepthSnapshotResponse {
    pub fn into_order_book(self, symbol: &str) -> Result<OrderBook, ApiError> {
        let bids = parse_book_side(&self.bids, "bid")?;
        let asks = parse_book_side(&self.asks, "ask")?;
        Ok(OrderBook::new(symbol, self.last_update_id, bids, asks))
    }
}

/// Raw `/api/v3/ticker/24hr` payload, only the fields we consume
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hrResponse {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    pub volume: String,
    pub quote_volume: String,
}

impl TryFrom<Ticker24hrResponse> for Ticker24hr {
    type Error = ApiError;

    fn try_from(raw: Ticker24hrResponse) -> Result<Self, Self::Error> {
        Ok(Ticker24hr {
            last_price: parse_decimal(&raw.last_price, "lastPrice")?,
            price_change_percent: parse_decimal(&raw.price_change_percent, "priceChangePercent")?,
            volume: parse_decimal(&raw.volume, "volume")?,
            quote_volume: parse_decimal(&raw.quote_volume, "quoteVolume")?,
            symbol: raw.symbol,
        })
    }
}

/// Raw `/api/v3/trades` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTradeResponse {
    pub id: u64,
    pub price: String,
    pub qty: String,
    pub time: TimestampMS,
    pub is_buyer_maker: bool,
}

impl TryFrom<RecentTradeResponse> for Trade {
    type Error = ApiError;

    fn try_from(raw: RecentTradeResponse) -> Result<Self, Self::Error> {
        Ok(Trade {
            price: parse_decimal(&raw.price, "price")?,
            quantity: parse_decimal(&raw.qty, "qty")?,
            is_buyer_maker: raw.is_buyer_maker,
            time: raw.time,
        })
    }
}

/// Parse a Binance decimal string, rejecting anything non-finite
pub fn parse_decimal(value: &str, field: &str) -> Result<f64, ApiError> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ApiError::Parse(format!("Failed to parse {} '{}' as f64", field, value)))?;
    if !parsed.is_finite() {
        return Err(ApiError::Parse(format!("Non-finite {} '{}'", field, value)));
    }
    Ok(parsed)
}

fn parse_book_side(raw: &[[String; 2]], side: &str) -> Result<Vec<BookLevel>, ApiError> {
    raw.iter()
        .map(|[price, quantity]| {
            Ok(BookLevel::new(
                parse_decimal(price, &format!("{} price", side))?,
                parse_decimal(quantity, &format!("{} quantity", side))?,
            ))
        })
        .collect()
}
