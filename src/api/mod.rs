pub mod binance;
pub mod source;
pub mod types;

pub use binance::BinanceMarketClient;
pub use source::MarketDataSource;
#[cfg(test)]
pub use source::MockMarketDataSource;
pub use types::*;
