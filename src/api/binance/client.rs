use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::api::source::MarketDataSource;
use crate::api::types::{ApiEndpoint, ApiError, DepthSnapshotResponse, RecentTradeResponse, Ticker24hrResponse};
use crate::common::constants::{
    DEFAULT_RETRY_AFTER_SECONDS, HTTP_TIMEOUT_SECONDS, MAX_DEPTH_LIMIT, MAX_TRADE_LIMIT,
};
use crate::market::{OrderBook, Ticker24hr, Trade};

/// Binance Spot REST client for depth, ticker and trade data
pub struct BinanceMarketClient {
    client: reqwest::Client,
    base_url: String,
    last_request_time: Mutex<Option<Instant>>,
    min_request_interval: Duration,
}

impl BinanceMarketClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            last_request_time: Mutex::new(None),
            min_request_interval: Duration::from_millis(50),
        })
    }

    /// Set minimum request interval for rate limiting
    pub fn set_min_request_interval(&mut self, interval: Duration) {
        self.min_request_interval = interval;
    }

    pub(crate) fn build_url(&self, endpoint: ApiEndpoint, symbol: &str, limit: Option<u32>) -> Result<String, ApiError> {
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidSymbol(symbol.to_string()));
        }

        let mut url = format!("{}{}?symbol={}", self.base_url, endpoint.binance_path(), symbol.to_uppercase());
        if let Some(limit) = limit {
            let max = match endpoint {
                ApiEndpoint::Depth => MAX_DEPTH_LIMIT,
                _ => MAX_TRADE_LIMIT,
            };
            url.push_str(&format!("&limit={}", limit.clamp(1, max)));
        }
        Ok(url)
    }

    async fn throttle(&self) {
        let mut last_request = self.last_request_time.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_request_interval {
                let delay = self.min_request_interval - elapsed;
                debug!("Rate limiting: waiting {:?} before next request", delay);
                sleep(delay).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.throttle().await;
        debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(format!("Request timed out: {}", e))
            } else {
                ApiError::Network(format!("Request failed: {}", e))
            }
        })?;

        if response.status().as_u16() == 429 {
            let retry_after_seconds = response.headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS);
            return Err(ApiError::RateLimit { retry_after_seconds });
        }

        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to read response body: {}", e)))?;

        debug!("Received response body ({}b): {}", body.len(), body.chars().take(200).collect::<String>());

        serde_json::from_str(&body).map_err(|e| ApiError::Parse(format!("Failed to parse JSON: {}", e)))
    }
}

#[async_trait]
impl MarketDataSource for BinanceMarketClient {
    async fn fetch_depth(&self, symbol: &str, limit: u32) -> Result<OrderBook, ApiError> {
        let url = self.build_url(ApiEndpoint::Depth, symbol, Some(limit))?;
        let raw: DepthSnapshotResponse = self.get_json(&url).await?;
        let book = raw.into_order_book(symbol)?;
        info!("✅ Fetched depth for {}: {} bids, {} asks", symbol, book.bids.len(), book.asks.len());
        Ok(book)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker24hr, ApiError> {
        let url = self.build_url(ApiEndpoint::Ticker24hr, symbol, None)?;
        let raw: Ticker24hrResponse = self.get_json(&url).await?;
        Ticker24hr::try_from(raw)
    }

    async fn fetch_recent_trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>, ApiError> {
        let url = self.build_url(ApiEndpoint::RecentTrades, symbol, Some(limit))?;
        let raw: Vec<RecentTradeResponse> = self.get_json(&url).await?;
        let trades = raw.into_iter().map(Trade::try_from).collect::<Result<Vec<_>, _>>()?;
        debug!("Fetched {} trades for {}", trades.len(), symbol);
        Ok(trades)
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_depth_url() {
        let client = BinanceMarketClient::new("https://api.binance.com/").unwrap();
        let url = client.build_url(ApiEndpoint::Depth, "btcusdt", Some(100)).unwrap();
        assert_eq!(url, "https://api.binance.com/api/v3/depth?symbol=BTCUSDT&limit=100");
    }

    #[test]
    fn test_build_url_clamps_limit() {
        let client = BinanceMarketClient::new("https://api.binance.com").unwrap();
        let url = client.build_url(ApiEndpoint::RecentTrades, "ETHUSDT", Some(50_000)).unwrap();
        assert!(url.ends_with(&format!("limit={}", MAX_TRADE_LIMIT)));

        let url = client.build_url(ApiEndpoint::Ticker24hr, "ETHUSDT", None).unwrap();
        assert_eq!(url, "https://api.binance.com/api/v3/ticker/24hr?symbol=ETHUSDT");
    }

    #[test]
    fn test_build_url_rejects_bad_symbol() {
        let client = BinanceMarketClient::new("https://api.binance.com").unwrap();
        assert!(matches!(
            client.build_url(ApiEndpoint::Depth, "BTC/USDT", Some(10)),
            Err(ApiError::InvalidSymbol(_))
        ));
        assert!(client.build_url(ApiEndpoint::Depth, "", None).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = BinanceMarketClient::new("http://127.0.0.1:1").unwrap();
        let err = client.fetch_ticker("BTCUSDT").await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
