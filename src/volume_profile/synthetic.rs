//! Placeholder profile generator
//!
//! Used only when no usable market data is available. The shape is a
//! Gaussian bump centred on the reference price with uniform random jitter,
//! so two calls never agree. Output is always tagged
//! [`ProfileSnapshot::Synthetic`](super::structs::ProfileSnapshot::Synthetic)
//! by the caller and must not be mixed with market-derived levels.

use chrono::Utc;
use rand::Rng;
use tracing::warn;

use crate::common::constants::{FALLBACK_PRICE_BNB, FALLBACK_PRICE_BTC, FALLBACK_PRICE_ETH, FALLBACK_PRICE_OTHER};
use crate::market::TimestampMS;
use super::calculator::{derive_profile, PriceWindow};
use super::structs::{PriceLevel, ResolvedAssetConfig, VolumeProfile};

const BASE_VOLUME: f64 = 500_000.0;
const GAUSSIAN_VOLUME: f64 = 800_000.0;
const GAUSSIAN_SPREAD: f64 = 0.08;
const CENTER_FALLOFF: f64 = 0.8;
const JITTER_MIN: f64 = 0.9;
const JITTER_MAX: f64 = 1.1;

/// Reference price used when nothing is known about `symbol`
pub fn default_reference_price(symbol: &str) -> f64 {
    match symbol {
        "BTCUSDT" => FALLBACK_PRICE_BTC,
        "ETHUSDT" => FALLBACK_PRICE_ETH,
        "BNBUSDT" => FALLBACK_PRICE_BNB,
        _ => FALLBACK_PRICE_OTHER,
    }
}

/// Generate a placeholder profile using the thread-local RNG
pub fn generate_synthetic_profile_default(symbol: &str, center_price: f64, config: &ResolvedAssetConfig) -> Option<VolumeProfile> {
    generate_synthetic_profile(symbol, center_price, config, &mut rand::thread_rng(), Utc::now().timestamp_millis())
}

/// Generate a placeholder profile centred on `center_price`
///
/// A non-positive or non-finite center falls back to
/// [`default_reference_price`].
pub fn generate_synthetic_profile<R: Rng>(
    symbol: &str,
    center_price: f64,
    config: &ResolvedAssetConfig,
    rng: &mut R,
    computed_at: TimestampMS,
) -> Option<VolumeProfile> {
    let center_price = if center_price.is_finite() && center_price > 0.0 {
        center_price
    } else {
        let fallback = default_reference_price(symbol);
        warn!("Synthetic profile for {}: invalid center {}, using {}", symbol, center_price, fallback);
        fallback
    };

    let window = PriceWindow::new(center_price, config.price_range_percent, config.level_count)?;
    let half = window.level_count as f64 / 2.0;
    let span = window.max_price - window.min_price;

    let levels: Vec<PriceLevel> = (0..window.level_count)
        .map(|i| {
            let price = window.bucket_price(i);
            let distance_from_center = (i as f64 - half).abs() / half;
            let volume_multiplier = 1.0 - distance_from_center * CENTER_FALLOFF;

            let position = (price - window.min_price) / span;
            let gaussian = (-(position - 0.5).powi(2) / GAUSSIAN_SPREAD).exp();
            let jitter = rng.gen_range(JITTER_MIN..JITTER_MAX);
            let volume = (BASE_VOLUME + gaussian * GAUSSIAN_VOLUME * volume_multiplier) * jitter;

            let buy_ratio = buy_ratio(position);
            PriceLevel::with_volumes(price, volume * buy_ratio, volume * (1.0 - buy_ratio))
        })
        .collect();

    derive_profile(symbol, center_price, levels, config, computed_at)
}

/// Buy share for a bucket at relative `position` (0 = bottom, 1 = top of window)
fn buy_ratio(position: f64) -> f64 {
    let bias = if position > 0.5 {
        0.45 + (position - 0.5) * 0.2
    } else {
        0.55 - (0.5 - position) * 0.2
    };
    bias.clamp(0.3, 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ResolvedAssetConfig {
        ResolvedAssetConfig::default()
    }

    #[test]
    fn test_default_reference_prices() {
        assert_eq!(default_reference_price("BTCUSDT"), 98_000.0);
        assert_eq!(default_reference_price("ETHUSDT"), 3_500.0);
        assert_eq!(default_reference_price("BNBUSDT"), 700.0);
        assert_eq!(default_reference_price("DOGEUSDT"), 100.0);
    }

    #[test]
    fn test_synthetic_profile_is_dense_and_centred() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = generate_synthetic_profile("BTCUSDT", 98_000.0, &config(), &mut rng, 1).unwrap();

        assert_eq!(profile.levels.len(), 100);
        assert!(profile.levels.windows(2).all(|w| w[0].price > w[1].price));
        assert!(profile.val <= profile.poc && profile.poc <= profile.vah);
        // The bump peaks near the middle of the window
        assert!((profile.poc - 98_000.0).abs() / 98_000.0 < 0.01);
    }

    #[test]
    fn test_synthetic_profile_invalid_center_uses_default() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = generate_synthetic_profile("ETHUSDT", 0.0, &config(), &mut rng, 1).unwrap();
        assert_eq!(profile.reference_price, 3_500.0);
    }

    #[test]
    fn test_synthetic_profile_varies_between_draws() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = generate_synthetic_profile("BTCUSDT", 100.0, &config(), &mut rng, 1).unwrap();
        let b = generate_synthetic_profile("BTCUSDT", 100.0, &config(), &mut rng, 1).unwrap();
        assert_ne!(a.levels, b.levels);
    }

    #[test]
    fn test_buy_ratio_bounds() {
        assert!((buy_ratio(0.5) - 0.55).abs() < 1e-12);
        assert!((buy_ratio(1.0) - 0.55).abs() < 1e-12);
        assert!((buy_ratio(0.0) - 0.45).abs() < 1e-12);
        for i in 0..=100 {
            let ratio = buy_ratio(i as f64 / 100.0);
            assert!((0.3..=0.7).contains(&ratio));
        }
    }

    #[test]
    fn test_default_generator_produces_profile() {
        let profile = generate_synthetic_profile_default("SOLUSDT", 150.0, &config()).unwrap();
        assert_eq!(profile.symbol, "SOLUSDT");
        assert!(profile.total_volume > 0.0);
    }
}
