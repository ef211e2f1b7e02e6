pub mod client;

pub use client::BinanceMarketClient;
