/// Market data domain types
///
/// Order book snapshots, trade tapes and 24h market statistics as consumed by
/// the volume profile builder. Wire formats live in `crate::api`.
pub mod stats;
pub mod structs;

pub use stats::{MarketStats, Ticker24hr, VolumeChangeTracker};
pub use structs::{BookLevel, OrderBook, TimestampMS, Trade};
