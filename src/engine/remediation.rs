//! Tree-planting recommendation.

use crate::config::EngineConfig;

/// Trees to plant so the final happiness reaches the configured target.
///
/// Zero when `final_happiness >= happiness_target`. Otherwise
/// `floor(deficit * trees_per_happiness_point)` plus
/// `floor(trees_cut * cut_tree_penalty)` when trees were cut. The result is
/// advisory and never fed back into the projection.
#[must_use]
pub fn recommend_trees(final_happiness: f64, trees_cut: u32, config: &EngineConfig) -> u64 {
    if final_happiness >= config.happiness_target {
        return 0;
    }

    let deficit = config.happiness_target - final_happiness;
    let mut trees = floor_to_count(deficit * config.trees_per_happiness_point);
    if trees_cut > 0 {
        trees = trees.saturating_add(floor_to_count(f64::from(trees_cut) * config.cut_tree_penalty));
    }
    trees
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_to_count(value: f64) -> u64 {
    // `as` saturates: NaN and negatives become 0.
    value.floor() as u64
}
