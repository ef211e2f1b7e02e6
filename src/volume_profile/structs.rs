use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::common::constants::{
    DEFAULT_HVN_AVERAGE_MULTIPLIER, DEFAULT_HVN_MAX_MULTIPLIER, DEFAULT_LEVEL_COUNT,
    DEFAULT_LVN_AVERAGE_MULTIPLIER, DEFAULT_LVN_MAX_MULTIPLIER, DEFAULT_PRICE_RANGE_PERCENT,
    DEFAULT_VALUE_AREA_PERCENTAGE,
};
use crate::market::TimestampMS;

/// Asset-specific volume profile configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_area_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_area_calculation_mode: Option<ValueAreaCalculationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_threshold_mode: Option<NodeThresholdMode>,
}

/// Volume profile configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub enabled: bool,
    /// Half-width of the bucketed window as a fraction of the reference price
    pub price_range_percent: f64,
    /// Number of equal-width buckets spanning the window
    pub level_count: u32,
    pub value_area_percentage: f64,
    pub value_area_calculation_mode: ValueAreaCalculationMode,
    pub node_threshold_mode: NodeThresholdMode,
    pub node_thresholds: NodeThresholds,
    pub asset_overrides: HashMap<String, AssetConfig>,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price_range_percent: DEFAULT_PRICE_RANGE_PERCENT,
            level_count: DEFAULT_LEVEL_COUNT,
            value_area_percentage: DEFAULT_VALUE_AREA_PERCENTAGE,
            value_area_calculation_mode: ValueAreaCalculationMode::Traditional,
            node_threshold_mode: NodeThresholdMode::AverageRelative,
            node_thresholds: NodeThresholds::default(),
            asset_overrides: HashMap::new(),
        }
    }
}

impl VolumeProfileConfig {
    /// Resolve configuration for a specific asset, applying overrides if they exist
    pub fn resolve_for_asset(&self, symbol: &str) -> ResolvedAssetConfig {
        let asset_override = self.asset_overrides.get(symbol);

        ResolvedAssetConfig {
            price_range_percent: asset_override
                .and_then(|c| c.price_range_percent)
                .unwrap_or(self.price_range_percent),
            level_count: asset_override
                .and_then(|c| c.level_count)
                .unwrap_or(self.level_count),
            value_area_percentage: asset_override
                .and_then(|c| c.value_area_percentage)
                .unwrap_or(self.value_area_percentage),
            value_area_calculation_mode: asset_override
                .and_then(|c| c.value_area_calculation_mode.clone())
                .unwrap_or_else(|| self.value_area_calculation_mode.clone()),
            node_threshold_mode: asset_override
                .and_then(|c| c.node_threshold_mode.clone())
                .unwrap_or_else(|| self.node_threshold_mode.clone()),
            node_thresholds: self.node_thresholds.clone(),
        }
    }

    /// Validate configuration for consistency and reasonable values
    pub fn validate(&self) -> Result<(), String> {
        validate_range_percent(self.price_range_percent)?;
        validate_level_count(self.level_count)?;
        validate_value_area_percentage(self.value_area_percentage)?;
        self.node_thresholds.validate()?;

        for (symbol, asset_config) in &self.asset_overrides {
            if let Some(range) = asset_config.price_range_percent {
                validate_range_percent(range).map_err(|e| format!("Asset {}: {}", symbol, e))?;
            }

            if let Some(levels) = asset_config.level_count {
                validate_level_count(levels).map_err(|e| format!("Asset {}: {}", symbol, e))?;
            }

            if let Some(va_pct) = asset_config.value_area_percentage {
                validate_value_area_percentage(va_pct).map_err(|e| format!("Asset {}: {}", symbol, e))?;
            }
        }

        Ok(())
    }
}

fn validate_range_percent(range: f64) -> Result<(), String> {
    if !(range > 0.0 && range <= 0.5) {
        return Err(format!("price_range_percent must be in (0, 0.5], got {}", range));
    }
    Ok(())
}

fn validate_level_count(levels: u32) -> Result<(), String> {
    if !(10..=10000).contains(&levels) {
        return Err(format!("level_count must be between 10 and 10000, got {}", levels));
    }
    Ok(())
}

fn validate_value_area_percentage(va_pct: f64) -> Result<(), String> {
    if !(50.0..=95.0).contains(&va_pct) {
        return Err(format!("value_area_percentage must be between 50% and 95%, got {}%", va_pct));
    }
    Ok(())
}

/// Resolved configuration for a specific asset after applying overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssetConfig {
    pub price_range_percent: f64,
    pub level_count: u32,
    pub value_area_percentage: f64,
    pub value_area_calculation_mode: ValueAreaCalculationMode,
    pub node_threshold_mode: NodeThresholdMode,
    pub node_thresholds: NodeThresholds,
}

impl Default for ResolvedAssetConfig {
    fn default() -> Self {
        VolumeProfileConfig::default().resolve_for_asset("")
    }
}

/// Value area calculation methods
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValueAreaCalculationMode {
    /// Expand contiguously from POC, always taking the heavier neighbour
    Traditional,
    /// Pick the heaviest levels regardless of contiguity until target reached
    Greedy,
}

/// Reference used by the HVN/LVN thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeThresholdMode {
    /// Thresholds are multiples of the mean level volume
    AverageRelative,
    /// Thresholds are fractions of the POC volume
    MaxRelative,
}

/// Multipliers for HVN/LVN classification, one pair per threshold mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeThresholds {
    pub hvn_average_multiplier: f64,
    pub lvn_average_multiplier: f64,
    pub hvn_max_multiplier: f64,
    pub lvn_max_multiplier: f64,
}

impl Default for NodeThresholds {
    fn default() -> Self {
        Self {
            hvn_average_multiplier: DEFAULT_HVN_AVERAGE_MULTIPLIER,
            lvn_average_multiplier: DEFAULT_LVN_AVERAGE_MULTIPLIER,
            hvn_max_multiplier: DEFAULT_HVN_MAX_MULTIPLIER,
            lvn_max_multiplier: DEFAULT_LVN_MAX_MULTIPLIER,
        }
    }
}

impl NodeThresholds {
    /// (hvn, lvn) multipliers for the given mode
    pub fn multipliers(&self, mode: &NodeThresholdMode) -> (f64, f64) {
        match mode {
            NodeThresholdMode::AverageRelative => (self.hvn_average_multiplier, self.lvn_average_multiplier),
            NodeThresholdMode::MaxRelative => (self.hvn_max_multiplier, self.lvn_max_multiplier),
        }
    }

    /// HVN multiplier must exceed LVN multiplier so the node sets never overlap
    pub fn validate(&self) -> Result<(), String> {
        for (name, hvn, lvn) in [
            ("average", self.hvn_average_multiplier, self.lvn_average_multiplier),
            ("max", self.hvn_max_multiplier, self.lvn_max_multiplier),
        ] {
            if !(lvn >= 0.0 && hvn.is_finite()) {
                return Err(format!("{} node multipliers must be finite and non-negative", name));
            }
            if hvn <= lvn {
                return Err(format!(
                    "hvn_{}_multiplier ({}) must be greater than lvn_{}_multiplier ({})",
                    name, hvn, name, lvn
                ));
            }
        }
        Ok(())
    }
}

/// One price bucket of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Upper bound of the bucket
    pub price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub total_volume: f64,
    /// Share of the profile's total volume, 0-100
    pub percentage: f64,
}

impl PriceLevel {
    pub fn empty(price: f64) -> Self {
        Self {
            price,
            buy_volume: 0.0,
            sell_volume: 0.0,
            total_volume: 0.0,
            percentage: 0.0,
        }
    }

    pub fn with_volumes(price: f64, buy_volume: f64, sell_volume: f64) -> Self {
        Self {
            price,
            buy_volume,
            sell_volume,
            total_volume: buy_volume + sell_volume,
            percentage: 0.0,
        }
    }
}

/// Value area bounds and coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    /// Highest price in value area
    pub high: f64,
    /// Lowest price in value area
    pub low: f64,
    /// Total volume within value area
    pub volume: f64,
    /// Percentage of total volume in value area
    pub volume_percentage: f64,
    /// Number of price levels included
    pub level_count: usize,
}

impl Default for ValueArea {
    fn default() -> Self {
        Self {
            high: 0.0,
            low: 0.0,
            volume: 0.0,
            volume_percentage: 0.0,
            level_count: 0,
        }
    }
}

/// Volume profile derived from one market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub symbol: String,
    pub reference_price: f64,
    pub computed_at: TimestampMS,
    /// Non-empty levels, highest price first
    pub levels: Vec<PriceLevel>,
    /// Point of Control (price level with highest volume)
    pub poc: f64,
    /// Value Area High
    pub vah: f64,
    /// Value Area Low
    pub val: f64,
    pub value_area: ValueArea,
    pub total_volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    /// High Volume Node prices, highest first
    pub hvn_levels: Vec<f64>,
    /// Low Volume Node prices, highest first
    pub lvn_levels: Vec<f64>,
}

impl VolumeProfile {
    pub fn is_hvn(&self, price: f64) -> bool {
        self.hvn_levels.iter().any(|p| *p == price)
    }

    pub fn is_lvn(&self, price: f64) -> bool {
        self.lvn_levels.iter().any(|p| *p == price)
    }

    /// Level whose price equals `price` exactly
    pub fn level_at(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.iter().find(|level| level.price == price)
    }

    /// Buy share of total volume, 0-100
    pub fn buy_pressure(&self) -> f64 {
        if self.total_volume > 0.0 {
            self.buy_volume / self.total_volume * 100.0
        } else {
            0.0
        }
    }
}

/// Profile tagged with where its data came from
///
/// Synthetic profiles are placeholders generated when market data is
/// unavailable and must never be presented as real market structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "profile")]
pub enum ProfileSnapshot {
    Real(VolumeProfile),
    Synthetic(VolumeProfile),
}

impl ProfileSnapshot {
    pub fn profile(&self) -> &VolumeProfile {
        match self {
            ProfileSnapshot::Real(profile) | ProfileSnapshot::Synthetic(profile) => profile,
        }
    }

    pub fn into_profile(self) -> VolumeProfile {
        match self {
            ProfileSnapshot::Real(profile) | ProfileSnapshot::Synthetic(profile) => profile,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ProfileSnapshot::Synthetic(_))
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            ProfileSnapshot::Real(_) => "real",
            ProfileSnapshot::Synthetic(_) => "synthetic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VolumeProfileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.level_count, 100);
        assert_eq!(config.price_range_percent, 0.03);
        assert_eq!(config.value_area_percentage, 70.0);
        assert_eq!(config.node_threshold_mode, NodeThresholdMode::AverageRelative);
    }

    #[test]
    fn test_asset_specific_config_resolution() {
        let mut config = VolumeProfileConfig::default();
        config.asset_overrides.insert(
            "BTCUSDT".to_string(),
            AssetConfig {
                price_range_percent: Some(0.01),
                level_count: Some(200),
                value_area_percentage: Some(68.0),
                value_area_calculation_mode: Some(ValueAreaCalculationMode::Greedy),
                node_threshold_mode: Some(NodeThresholdMode::MaxRelative),
            },
        );

        let btc = config.resolve_for_asset("BTCUSDT");
        assert_eq!(btc.price_range_percent, 0.01);
        assert_eq!(btc.level_count, 200);
        assert_eq!(btc.value_area_percentage, 68.0);
        assert_eq!(btc.value_area_calculation_mode, ValueAreaCalculationMode::Greedy);
        assert_eq!(btc.node_threshold_mode, NodeThresholdMode::MaxRelative);

        let eth = config.resolve_for_asset("ETHUSDT");
        assert_eq!(eth.price_range_percent, config.price_range_percent);
        assert_eq!(eth.level_count, config.level_count);
        assert_eq!(eth.value_area_calculation_mode, ValueAreaCalculationMode::Traditional);
    }

    #[test]
    fn test_config_validation() {
        let mut config = VolumeProfileConfig::default();

        config.level_count = 5;
        assert!(config.validate().is_err());
        config.level_count = 100;

        config.price_range_percent = 0.0;
        assert!(config.validate().is_err());
        config.price_range_percent = 0.03;

        config.value_area_percentage = 99.0;
        assert!(config.validate().is_err());
        config.value_area_percentage = 70.0;

        config.node_thresholds.hvn_average_multiplier = 0.4;
        let err = config.validate().unwrap_err();
        assert!(err.contains("hvn_average_multiplier"));
        config.node_thresholds = NodeThresholds::default();

        config.asset_overrides.insert(
            "ETHUSDT".to_string(),
            AssetConfig { level_count: Some(1), ..Default::default() },
        );
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("Asset ETHUSDT"));
    }

    #[test]
    fn test_config_deserializes_partial_toml() {
        let config: VolumeProfileConfig = toml::from_str(
            r#"
            level_count = 50
            node_threshold_mode = "MaxRelative"

            [asset_overrides.SOLUSDT]
            price_range_percent = 0.05
            "#,
        )
        .unwrap();

        assert_eq!(config.level_count, 50);
        assert_eq!(config.price_range_percent, 0.03);
        assert_eq!(config.node_threshold_mode, NodeThresholdMode::MaxRelative);
        assert_eq!(config.resolve_for_asset("SOLUSDT").price_range_percent, 0.05);
    }

    #[test]
    fn test_snapshot_tagging() {
        let profile = VolumeProfile {
            symbol: "BTCUSDT".to_string(),
            reference_price: 100.0,
            computed_at: 0,
            levels: vec![PriceLevel::with_volumes(100.0, 60.0, 40.0)],
            poc: 100.0,
            vah: 100.0,
            val: 100.0,
            value_area: ValueArea::default(),
            total_volume: 100.0,
            buy_volume: 60.0,
            sell_volume: 40.0,
            hvn_levels: vec![],
            lvn_levels: vec![],
        };

        let real = ProfileSnapshot::Real(profile.clone());
        let synthetic = ProfileSnapshot::Synthetic(profile);
        assert!(!real.is_synthetic());
        assert!(synthetic.is_synthetic());
        assert_eq!(real.profile().buy_pressure(), 60.0);

        let json = serde_json::to_value(&synthetic).unwrap();
        assert_eq!(json["source"], "Synthetic");
        assert_eq!(json["profile"]["poc"], 100.0);
    }
}
