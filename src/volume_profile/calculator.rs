use chrono::Utc;
use tracing::{debug, warn};

use crate::market::{BookLevel, TimestampMS, Trade};
use super::nodes::classify_nodes;
use super::structs::{PriceLevel, ResolvedAssetConfig, VolumeProfile};
use super::value_area::{calculate_value_area, find_poc_index};

/// Equal-width price buckets spanning `reference * (1 ± range)`
///
/// Bucket `i` is labelled with its upper bound `max_price - i * level_size`,
/// so index 0 is the highest bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWindow {
    pub min_price: f64,
    pub max_price: f64,
    pub level_size: f64,
    pub level_count: usize,
}

impl PriceWindow {
    /// None when the reference price or window parameters cannot form buckets
    pub fn new(reference_price: f64, price_range_percent: f64, level_count: u32) -> Option<Self> {
        if !reference_price.is_finite() || reference_price <= 0.0 || level_count == 0 {
            return None;
        }

        let min_price = reference_price * (1.0 - price_range_percent);
        let max_price = reference_price * (1.0 + price_range_percent);
        let level_size = (max_price - min_price) / level_count as f64;
        if !(level_size > 0.0) {
            return None;
        }

        Some(Self {
            min_price,
            max_price,
            level_size,
            level_count: level_count as usize,
        })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min_price && price <= self.max_price
    }

    /// Bucket for `price`, or None when it falls outside the window
    pub fn bucket_index(&self, price: f64) -> Option<usize> {
        if !self.contains(price) {
            return None;
        }
        let index = ((self.max_price - price) / self.level_size).floor() as usize;
        Some(index.min(self.level_count - 1))
    }

    pub fn bucket_price(&self, index: usize) -> f64 {
        self.max_price - index as f64 * self.level_size
    }

    /// Dense, zero-volume buckets, highest price first
    pub fn empty_levels(&self) -> Vec<PriceLevel> {
        (0..self.level_count)
            .map(|i| PriceLevel::empty(self.bucket_price(i)))
            .collect()
    }
}

/// Side a unit of notional volume is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeSide {
    Buy,
    Sell,
}

/// Builds volume profiles from full order book snapshots or trade tapes
///
/// Every call recomputes from scratch; the builder holds configuration only.
#[derive(Debug, Clone)]
pub struct VolumeProfileBuilder {
    config: ResolvedAssetConfig,
}

impl VolumeProfileBuilder {
    pub fn new(config: ResolvedAssetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedAssetConfig {
        &self.config
    }

    pub fn window(&self, reference_price: f64) -> Option<PriceWindow> {
        PriceWindow::new(reference_price, self.config.price_range_percent, self.config.level_count)
    }

    /// Profile of resting bid (buy) and ask (sell) notional around `reference_price`
    pub fn build(&self, symbol: &str, reference_price: f64, bids: &[BookLevel], asks: &[BookLevel]) -> Option<VolumeProfile> {
        self.build_at(symbol, reference_price, bids, asks, Utc::now().timestamp_millis())
    }

    /// Same as [`build`](Self::build) with an explicit timestamp
    pub fn build_at(
        &self,
        symbol: &str,
        reference_price: f64,
        bids: &[BookLevel],
        asks: &[BookLevel],
        computed_at: TimestampMS,
    ) -> Option<VolumeProfile> {
        let Some(window) = self.window(reference_price) else {
            warn!("Skipping profile for {}: invalid reference price {}", symbol, reference_price);
            return None;
        };

        let mut levels = window.empty_levels();
        let bid_count = accumulate(
            &window,
            &mut levels,
            bids.iter().filter(|b| b.is_usable()).map(|b| (b.price, b.notional(), VolumeSide::Buy)),
        );
        let ask_count = accumulate(
            &window,
            &mut levels,
            asks.iter().filter(|a| a.is_usable()).map(|a| (a.price, a.notional(), VolumeSide::Sell)),
        );

        debug!(
            "Bucketed order book for {}: {}/{} bids, {}/{} asks inside [{:.4}, {:.4}]",
            symbol,
            bid_count,
            bids.len(),
            ask_count,
            asks.len(),
            window.min_price,
            window.max_price
        );

        derive_profile(symbol, reference_price, levels, &self.config, computed_at)
    }

    /// Profile of executed notional; buyer-maker trades count as sell volume
    pub fn build_from_trades(&self, symbol: &str, reference_price: f64, trades: &[Trade]) -> Option<VolumeProfile> {
        self.build_from_trades_at(symbol, reference_price, trades, Utc::now().timestamp_millis())
    }

    pub fn build_from_trades_at(
        &self,
        symbol: &str,
        reference_price: f64,
        trades: &[Trade],
        computed_at: TimestampMS,
    ) -> Option<VolumeProfile> {
        let Some(window) = self.window(reference_price) else {
            warn!("Skipping trade profile for {}: invalid reference price {}", symbol, reference_price);
            return None;
        };

        let mut levels = window.empty_levels();
        let trade_count = accumulate(
            &window,
            &mut levels,
            trades.iter().filter(|t| t.is_usable()).map(|t| {
                let side = if t.is_buyer_maker { VolumeSide::Sell } else { VolumeSide::Buy };
                (t.price, t.notional(), side)
            }),
        );

        debug!("Bucketed {}/{} trades for {}", trade_count, trades.len(), symbol);

        derive_profile(symbol, reference_price, levels, &self.config, computed_at)
    }
}

/// Add notional to buckets, returning how many entries landed in the window
fn accumulate(
    window: &PriceWindow,
    levels: &mut [PriceLevel],
    entries: impl Iterator<Item = (f64, f64, VolumeSide)>,
) -> usize {
    let mut count = 0;
    for (price, notional, side) in entries {
        if let Some(index) = window.bucket_index(price) {
            let level = &mut levels[index];
            match side {
                VolumeSide::Buy => level.buy_volume += notional,
                VolumeSide::Sell => level.sell_volume += notional,
            }
            count += 1;
        }
    }
    count
}

/// Derive totals, percentages, POC, value area and volume nodes
///
/// Empty levels are dropped and the rest ordered highest price first. Returns
/// None when no level carries volume.
pub fn derive_profile(
    symbol: &str,
    reference_price: f64,
    levels: Vec<PriceLevel>,
    config: &ResolvedAssetConfig,
    computed_at: TimestampMS,
) -> Option<VolumeProfile> {
    let mut levels: Vec<PriceLevel> = levels
        .into_iter()
        .filter_map(|mut level| {
            level.total_volume = level.buy_volume + level.sell_volume;
            (level.total_volume > 0.0).then_some(level)
        })
        .collect();

    if levels.is_empty() {
        debug!("No volume inside the profile window for {}", symbol);
        return None;
    }

    levels.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal));

    let total_volume: f64 = levels.iter().map(|level| level.total_volume).sum();
    let buy_volume: f64 = levels.iter().map(|level| level.buy_volume).sum();
    let sell_volume: f64 = levels.iter().map(|level| level.sell_volume).sum();

    for level in &mut levels {
        level.percentage = level.total_volume / total_volume * 100.0;
    }

    let poc_index = find_poc_index(&levels)?;
    let poc = levels[poc_index].price;
    let value_area = calculate_value_area(
        &levels,
        poc_index,
        config.value_area_percentage,
        &config.value_area_calculation_mode,
    );
    let nodes = classify_nodes(&levels, &config.node_threshold_mode, &config.node_thresholds);

    debug!(
        "Profile {}: {} levels, total {:.2}, POC {:.4}, VA [{:.4}, {:.4}] {:.1}%, {} HVN, {} LVN",
        symbol,
        levels.len(),
        total_volume,
        poc,
        value_area.low,
        value_area.high,
        value_area.volume_percentage,
        nodes.hvn_levels.len(),
        nodes.lvn_levels.len()
    );

    Some(VolumeProfile {
        symbol: symbol.to_string(),
        reference_price,
        computed_at,
        levels,
        poc,
        vah: value_area.high,
        val: value_area.low,
        value_area,
        total_volume,
        buy_volume,
        sell_volume,
        hvn_levels: nodes.hvn_levels,
        lvn_levels: nodes.lvn_levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume_profile::structs::{NodeThresholdMode, ValueAreaCalculationMode, VolumeProfileConfig};

    fn builder() -> VolumeProfileBuilder {
        VolumeProfileBuilder::new(VolumeProfileConfig::default().resolve_for_asset("BTCUSDT"))
    }

    fn side(data: &[(f64, f64)]) -> Vec<BookLevel> {
        data.iter().map(|&(p, q)| BookLevel::new(p, q)).collect()
    }

    #[test]
    fn test_window_geometry() {
        let window = PriceWindow::new(100.0, 0.03, 100).unwrap();
        assert!((window.min_price - 97.0).abs() < 1e-9);
        assert!((window.max_price - 103.0).abs() < 1e-9);
        assert!((window.level_size - 0.06).abs() < 1e-9);
        assert_eq!(window.bucket_price(0), window.max_price);
        assert_eq!(window.bucket_index(window.max_price), Some(0));
        assert_eq!(window.bucket_index(window.min_price), Some(99));
        assert_eq!(window.bucket_index(96.0), None);
        assert_eq!(window.bucket_index(103.5), None);
    }

    #[test]
    fn test_window_rejects_invalid_reference() {
        assert!(PriceWindow::new(0.0, 0.03, 100).is_none());
        assert!(PriceWindow::new(-5.0, 0.03, 100).is_none());
        assert!(PriceWindow::new(f64::NAN, 0.03, 100).is_none());
        assert!(PriceWindow::new(100.0, 0.03, 0).is_none());
    }

    #[test]
    fn test_two_sided_book() {
        let profile = builder()
            .build_at("BTCUSDT", 100.0, &side(&[(99.0, 10.0)]), &side(&[(101.0, 10.0)]), 1)
            .unwrap();

        assert_eq!(profile.levels.len(), 2);
        let upper = &profile.levels[0];
        let lower = &profile.levels[1];
        assert!(upper.price > lower.price);

        assert!((upper.price - 101.02).abs() < 1e-6);
        assert_eq!(upper.sell_volume, 1010.0);
        assert_eq!(upper.buy_volume, 0.0);
        assert!((lower.price - 99.04).abs() < 1e-6);
        assert_eq!(lower.buy_volume, 990.0);

        assert_eq!(profile.total_volume, 2000.0);
        assert_eq!(profile.buy_volume, 990.0);
        assert_eq!(profile.sell_volume, 1010.0);
        assert_eq!(profile.poc, upper.price);
        // Neither bucket alone reaches 70%, so both are in the value area
        assert_eq!(profile.vah, upper.price);
        assert_eq!(profile.val, lower.price);
        assert!((upper.percentage - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_level_collapses_value_area() {
        let profile = builder()
            .build_at("BTCUSDT", 100.0, &side(&[(100.0, 1000.0)]), &side(&[(102.0, 1.0)]), 1)
            .unwrap();

        let window = builder().window(100.0).unwrap();
        assert!((profile.poc - 100.0).abs() <= window.level_size + 1e-9);
        assert_eq!(profile.vah, profile.poc);
        assert_eq!(profile.val, profile.poc);
        assert_eq!(profile.value_area.level_count, 1);
    }

    #[test]
    fn test_empty_book_produces_no_profile() {
        assert!(builder().build("BTCUSDT", 100.0, &[], &[]).is_none());
    }

    #[test]
    fn test_out_of_window_levels_are_excluded() {
        let profile = builder()
            .build_at("BTCUSDT", 100.0, &side(&[(90.0, 50.0), (99.0, 1.0)]), &side(&[(110.0, 50.0)]), 1)
            .unwrap();
        assert_eq!(profile.levels.len(), 1);
        assert_eq!(profile.total_volume, 99.0);

        assert!(builder()
            .build("BTCUSDT", 100.0, &side(&[(50.0, 1.0)]), &side(&[(150.0, 1.0)]))
            .is_none());
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let window = builder().window(100.0).unwrap();
        let profile = builder()
            .build_at(
                "BTCUSDT",
                100.0,
                &side(&[(window.min_price, 1.0)]),
                &side(&[(window.max_price, 1.0)]),
                1,
            )
            .unwrap();

        assert_eq!(profile.levels.len(), 2);
        assert_eq!(profile.levels[0].price, window.max_price);
        assert_eq!(profile.levels[1].price, window.bucket_price(99));
    }

    #[test]
    fn test_invalid_reference_price_skips_build() {
        let bids = side(&[(99.0, 10.0)]);
        assert!(builder().build("BTCUSDT", 0.0, &bids, &[]).is_none());
        assert!(builder().build("BTCUSDT", -1.0, &bids, &[]).is_none());
        assert!(builder().build("BTCUSDT", f64::INFINITY, &bids, &[]).is_none());
    }

    #[test]
    fn test_unusable_levels_are_skipped() {
        let profile = builder()
            .build_at(
                "BTCUSDT",
                100.0,
                &side(&[(99.0, 0.0), (99.5, -3.0), (f64::NAN, 1.0), (99.9, 2.0)]),
                &[],
                1,
            )
            .unwrap();
        assert_eq!(profile.levels.len(), 1);
        assert!((profile.total_volume - 199.8).abs() < 1e-9);
    }

    #[test]
    fn test_same_bucket_aggregates_both_sides() {
        let profile = builder()
            .build_at("BTCUSDT", 100.0, &side(&[(100.01, 2.0)]), &side(&[(100.02, 3.0)]), 1)
            .unwrap();
        assert_eq!(profile.levels.len(), 1);
        let level = &profile.levels[0];
        assert_eq!(level.total_volume, level.buy_volume + level.sell_volume);
        assert_eq!(level.percentage, 100.0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let bids = side(&[(99.1, 3.0), (98.2, 7.5), (99.9, 1.25), (97.5, 4.0)]);
        let asks = side(&[(100.1, 2.0), (101.7, 6.0), (102.9, 0.5), (100.05, 9.0)]);
        let first = builder().build_at("BTCUSDT", 100.0, &bids, &asks, 7);
        let second = builder().build_at("BTCUSDT", 100.0, &bids, &asks, 7);
        assert_eq!(first, second);
    }

    #[test]
    fn test_book_order_does_not_matter() {
        let bids = side(&[(99.1, 3.0), (98.2, 7.5), (99.9, 1.25)]);
        let mut reversed = bids.clone();
        reversed.reverse();
        let asks = side(&[(100.1, 2.0), (101.7, 6.0)]);

        let a = builder().build_at("BTCUSDT", 100.0, &bids, &asks, 1).unwrap();
        let b = builder().build_at("BTCUSDT", 100.0, &reversed, &asks, 1).unwrap();
        assert_eq!(a.levels, b.levels);
        assert_eq!(a.poc, b.poc);
    }

    #[test]
    fn test_trade_tape_sides() {
        let trades = vec![
            Trade { price: 99.5, quantity: 2.0, is_buyer_maker: false, time: 1 },
            Trade { price: 99.5, quantity: 1.0, is_buyer_maker: true, time: 2 },
            Trade { price: 101.0, quantity: 1.0, is_buyer_maker: true, time: 3 },
        ];
        let profile = builder().build_from_trades_at("BTCUSDT", 100.0, &trades, 1).unwrap();

        assert_eq!(profile.levels.len(), 2);
        assert_eq!(profile.buy_volume, 199.0);
        assert_eq!(profile.sell_volume, 99.5 + 101.0);
        assert!(profile.levels[1].buy_volume > 0.0 && profile.levels[1].sell_volume > 0.0);
    }

    #[test]
    fn test_derive_profile_sorts_and_drops_empty_levels() {
        let config = VolumeProfileConfig::default().resolve_for_asset("X");
        let levels = vec![
            PriceLevel::with_volumes(99.0, 5.0, 5.0),
            PriceLevel::empty(100.0),
            PriceLevel::with_volumes(101.0, 20.0, 10.0),
        ];
        let profile = derive_profile("X", 100.0, levels, &config, 1).unwrap();
        let prices: Vec<f64> = profile.levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![101.0, 99.0]);
        assert_eq!(profile.poc, 101.0);

        assert!(derive_profile("X", 100.0, vec![PriceLevel::empty(100.0)], &config, 1).is_none());
    }

    #[test]
    fn test_configured_modes_are_applied() {
        let mut config = VolumeProfileConfig::default();
        config.node_threshold_mode = NodeThresholdMode::MaxRelative;
        config.value_area_calculation_mode = ValueAreaCalculationMode::Greedy;
        let builder = VolumeProfileBuilder::new(config.resolve_for_asset("BTCUSDT"));

        let profile = builder
            .build_at("BTCUSDT", 100.0, &side(&[(99.0, 10.0)]), &side(&[(101.0, 10.0)]), 1)
            .unwrap();
        // With max-relative thresholds both near-equal levels exceed 70% of the POC
        assert_eq!(profile.hvn_levels.len(), 2);
        assert!(profile.lvn_levels.is_empty());
    }
}
