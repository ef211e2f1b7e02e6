/// Market data and profile constants

// Exchange endpoints
pub const BINANCE_API_BASE_URL: &str = "https://api.binance.com";
pub const DEPTH_PATH: &str = "/api/v3/depth";
pub const TICKER_24HR_PATH: &str = "/api/v3/ticker/24hr";
pub const RECENT_TRADES_PATH: &str = "/api/v3/trades";

// Request limits
pub const DEFAULT_DEPTH_LIMIT: u32 = 100;
pub const MAX_DEPTH_LIMIT: u32 = 5000;
pub const DEFAULT_TRADE_LIMIT: u32 = 500;
pub const MAX_TRADE_LIMIT: u32 = 1000;
pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

// Refresh cadence
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 5;

// Profile window
pub const DEFAULT_PRICE_RANGE_PERCENT: f64 = 0.03;
pub const DEFAULT_LEVEL_COUNT: u32 = 100;
pub const DEFAULT_VALUE_AREA_PERCENTAGE: f64 = 70.0;

// Node thresholds
pub const DEFAULT_HVN_AVERAGE_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_LVN_AVERAGE_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_HVN_MAX_MULTIPLIER: f64 = 0.7;
pub const DEFAULT_LVN_MAX_MULTIPLIER: f64 = 0.3;

// Symbols
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

// Placeholder reference prices used when no market price is known
pub const FALLBACK_PRICE_BTC: f64 = 98_000.0;
pub const FALLBACK_PRICE_ETH: f64 = 3_500.0;
pub const FALLBACK_PRICE_BNB: f64 = 700.0;
pub const FALLBACK_PRICE_OTHER: f64 = 100.0;

// Floating point tolerance for profile invariants
pub const PERCENTAGE_TOLERANCE: f64 = 1e-6;
pub const RELATIVE_VOLUME_TOLERANCE: f64 = 1e-9;
