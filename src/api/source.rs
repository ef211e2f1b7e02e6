use async_trait::async_trait;

use crate::api::types::ApiError;
use crate::market::{OrderBook, Ticker24hr, Trade};

/// Market data provider for a single exchange
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Full order book snapshot, `limit` levels per side
    async fn fetch_depth(&self, symbol: &str, limit: u32) -> Result<OrderBook, ApiError>;

    /// 24hr rolling ticker statistics
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker24hr, ApiError>;

    /// Most recent public trades, oldest first
    async fn fetch_recent_trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>, ApiError>;

    /// Exchange name for identification
    fn name(&self) -> &'static str;
}
