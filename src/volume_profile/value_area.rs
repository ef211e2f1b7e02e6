//! Value Area computation
//!
//! Both methods operate on the sparse, price-descending level list produced by
//! the builder: index 0 is the highest price, so "upper" means a smaller index.

use std::cmp::Ordering;

use tracing::debug;

use super::structs::{PriceLevel, ValueArea, ValueAreaCalculationMode};

/// Index of the Point of Control
///
/// Ties go to the first level in iteration order, i.e. the highest price.
pub fn find_poc_index(levels: &[PriceLevel]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, level) in levels.iter().enumerate() {
        match best {
            Some((_, volume)) if level.total_volume <= volume => {}
            _ => best = Some((index, level.total_volume)),
        }
    }
    best.map(|(index, _)| index)
}

/// Calculate the value area around `poc_index` covering `value_area_percentage` of volume
pub fn calculate_value_area(
    levels: &[PriceLevel],
    poc_index: usize,
    value_area_percentage: f64,
    calculation_mode: &ValueAreaCalculationMode,
) -> ValueArea {
    let total_volume: f64 = levels.iter().map(|level| level.total_volume).sum();
    if poc_index >= levels.len() || total_volume <= 0.0 {
        return ValueArea::default();
    }

    let target_volume = total_volume * (value_area_percentage / 100.0);

    match calculation_mode {
        ValueAreaCalculationMode::Traditional => {
            calculate_value_area_traditional(levels, poc_index, total_volume, target_volume)
        }
        ValueAreaCalculationMode::Greedy => {
            calculate_value_area_greedy(levels, poc_index, total_volume, target_volume)
        }
    }
}

/// Contiguous expansion from POC, one neighbour per step
///
/// The heavier of the two candidate neighbours is added; on equal volume the
/// upper (higher price) neighbour goes first. An exhausted side is never a
/// candidate, so the loop ends once both sides are used up.
fn calculate_value_area_traditional(
    levels: &[PriceLevel],
    poc_index: usize,
    total_volume: f64,
    target_volume: f64,
) -> ValueArea {
    let mut upper_index = poc_index;
    let mut lower_index = poc_index;
    let mut included_volume = levels[poc_index].total_volume;

    while included_volume < target_volume {
        let upper_candidate = upper_index.checked_sub(1).map(|i| levels[i].total_volume);
        let lower_candidate = levels.get(lower_index + 1).map(|level| level.total_volume);

        match (upper_candidate, lower_candidate) {
            (Some(upper), lower) if lower.map_or(true, |lower| upper >= lower) => {
                upper_index -= 1;
                included_volume += upper;
            }
            (_, Some(lower)) => {
                lower_index += 1;
                included_volume += lower;
            }
            _ => break,
        }
    }

    debug!(
        "Traditional value area: levels {}..={} of {}, {:.2}/{:.2}",
        upper_index,
        lower_index,
        levels.len(),
        included_volume,
        target_volume
    );

    ValueArea {
        high: levels[upper_index].price,
        low: levels[lower_index].price,
        volume: included_volume,
        volume_percentage: included_volume / total_volume * 100.0,
        level_count: lower_index - upper_index + 1,
    }
}

/// Heaviest-first selection, ignoring contiguity
///
/// The sort is stable, so among equal volumes the higher price is taken first
/// and the POC is always the first pick.
fn calculate_value_area_greedy(
    levels: &[PriceLevel],
    poc_index: usize,
    total_volume: f64,
    target_volume: f64,
) -> ValueArea {
    let mut order: Vec<usize> = (0..levels.len()).collect();
    order.sort_by(|&a, &b| {
        levels[b]
            .total_volume
            .partial_cmp(&levels[a].total_volume)
            .unwrap_or(Ordering::Equal)
    });

    let poc_price = levels[poc_index].price;
    let mut high = poc_price;
    let mut low = poc_price;
    let mut included_volume = levels[poc_index].total_volume;
    let mut level_count = 1;

    for index in order.into_iter().filter(|&i| i != poc_index) {
        if included_volume >= target_volume {
            break;
        }
        let level = &levels[index];
        included_volume += level.total_volume;
        high = high.max(level.price);
        low = low.min(level.price);
        level_count += 1;
    }

    debug!(
        "Greedy value area: {} levels, [{:.4}, {:.4}], {:.2}/{:.2}",
        level_count, low, high, included_volume, target_volume
    );

    ValueArea {
        high,
        low,
        volume: included_volume,
        volume_percentage: included_volume / total_volume * 100.0,
        level_count,
    }
}
