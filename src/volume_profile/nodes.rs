//! High/Low Volume Node classification

use serde::{Deserialize, Serialize};

use super::structs::{NodeThresholdMode, NodeThresholds, PriceLevel};

/// HVN and LVN prices, each in level order (highest price first)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeNodes {
    pub hvn_levels: Vec<f64>,
    pub lvn_levels: Vec<f64>,
}

/// Classify levels as HVN (`volume > reference * hvn`) or LVN (`volume < reference * lvn`)
///
/// The reference is the mean level volume for `AverageRelative` and the POC
/// volume for `MaxRelative`. With `hvn > lvn` the two sets are disjoint.
pub fn classify_nodes(levels: &[PriceLevel], mode: &NodeThresholdMode, thresholds: &NodeThresholds) -> VolumeNodes {
    if levels.is_empty() {
        return VolumeNodes::default();
    }

    let reference = match mode {
        NodeThresholdMode::AverageRelative => {
            levels.iter().map(|level| level.total_volume).sum::<f64>() / levels.len() as f64
        }
        NodeThresholdMode::MaxRelative => levels
            .iter()
            .map(|level| level.total_volume)
            .fold(0.0, f64::max),
    };

    let (hvn_multiplier, lvn_multiplier) = thresholds.multipliers(mode);
    let hvn_threshold = reference * hvn_multiplier;
    let lvn_threshold = reference * lvn_multiplier;

    VolumeNodes {
        hvn_levels: levels
            .iter()
            .filter(|level| level.total_volume > hvn_threshold)
            .map(|level| level.price)
            .collect(),
        lvn_levels: levels
            .iter()
            .filter(|level| level.total_volume < lvn_threshold)
            .map(|level| level.price)
            .collect(),
    }
}
