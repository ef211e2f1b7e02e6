use crate::common::constants::{PERCENTAGE_TOLERANCE, RELATIVE_VOLUME_TOLERANCE};
use super::structs::VolumeProfile;

/// Outcome of checking a profile against its structural invariants
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileValidationResult {
    pub is_valid: bool,
    /// Invariant violations
    pub errors: Vec<String>,
    /// Unusual but legal shapes
    pub warnings: Vec<String>,
}

/// Validates computed profiles
#[derive(Debug, Clone)]
pub struct ProfileValidator;

impl ProfileValidator {
    pub fn validate(profile: &VolumeProfile) -> ProfileValidationResult {
        let mut result = ProfileValidationResult {
            is_valid: true,
            ..Default::default()
        };

        if profile.levels.is_empty() {
            result.is_valid = false;
            result.errors.push("Profile has no price levels".to_string());
            return result;
        }

        let volume_tolerance = profile.total_volume.abs() * RELATIVE_VOLUME_TOLERANCE;

        // Rule 1: per-level total identity
        for level in &profile.levels {
            if (level.total_volume - (level.buy_volume + level.sell_volume)).abs() > volume_tolerance {
                result.errors.push(format!(
                    "Level {:.4}: total {:.4} != buy {:.4} + sell {:.4}",
                    level.price, level.total_volume, level.buy_volume, level.sell_volume
                ));
            }
            if level.total_volume <= 0.0 {
                result.errors.push(format!("Level {:.4} carries no volume", level.price));
            }
        }

        // Rule 2: strictly descending prices
        if let Some(pair) = profile.levels.windows(2).find(|w| w[0].price <= w[1].price) {
            result.errors.push(format!(
                "Levels not strictly descending: {:.4} followed by {:.4}",
                pair[0].price, pair[1].price
            ));
        }

        // Rule 3: level sum equals grand total
        let level_sum: f64 = profile.levels.iter().map(|l| l.total_volume).sum();
        if (level_sum - profile.total_volume).abs() > volume_tolerance {
            result.errors.push(format!(
                "Level volume sum {:.4} != total volume {:.4}",
                level_sum, profile.total_volume
            ));
        }
        if (profile.buy_volume + profile.sell_volume - profile.total_volume).abs() > volume_tolerance {
            result.errors.push(format!(
                "Buy {:.4} + sell {:.4} != total {:.4}",
                profile.buy_volume, profile.sell_volume, profile.total_volume
            ));
        }

        // Rule 4: percentages sum to 100
        let percentage_sum: f64 = profile.levels.iter().map(|l| l.percentage).sum();
        if (percentage_sum - 100.0).abs() > PERCENTAGE_TOLERANCE * profile.levels.len() as f64 {
            result.errors.push(format!("Percentages sum to {:.8}, expected 100", percentage_sum));
        }

        // Rule 5: val <= poc <= vah
        if !(profile.val <= profile.poc && profile.poc <= profile.vah) {
            result.errors.push(format!(
                "POC outside value area: VAL={:.4}, POC={:.4}, VAH={:.4}",
                profile.val, profile.poc, profile.vah
            ));
        }

        // Rule 6: POC is a maximal level
        let max_volume = profile.levels.iter().map(|l| l.total_volume).fold(0.0, f64::max);
        match profile.level_at(profile.poc) {
            Some(level) if level.total_volume == max_volume => {}
            Some(level) => result.errors.push(format!(
                "POC level volume {:.4} is below maximum {:.4}",
                level.total_volume, max_volume
            )),
            None => result.errors.push(format!("POC {:.4} is not a profile level", profile.poc)),
        }

        // Rule 7: HVN and LVN disjoint
        if let Some(price) = profile.hvn_levels.iter().find(|p| profile.lvn_levels.contains(p)) {
            result.errors.push(format!("Price {:.4} classified as both HVN and LVN", price));
        }

        if profile.levels.len() < 3 {
            result.warnings.push(format!("Very sparse profile: only {} levels", profile.levels.len()));
        }
        if profile.vah == profile.val && profile.levels.len() > 1 {
            result.warnings.push("Value area collapsed to a single level".to_string());
        }

        result.is_valid = result.errors.is_empty();
        result
    }
}
