//! One simulated year's state snapshot.

use serde::{Deserialize, Serialize};

/// Pollution index per unit of AQI.
pub const POLLUTION_PER_AQI: f64 = 1.2;

/// Full state of a locality in one projected year.
///
/// Every value is rounded to 2 decimal places and already clamped:
/// `aqi` and `carbon_budget` are non-negative, the remaining indices lie
/// in `[0, 100]`, and `pollution_index` is always `round(aqi * 1.2, 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Calendar year of the snapshot.
    pub year: i32,
    /// Air quality index.
    pub aqi: f64,
    /// Water quality, 0 to 100.
    pub water_quality: f64,
    /// `aqi * 1.2` from the unrounded AQI.
    pub pollution_index: f64,
    /// Remaining carbon budget.
    pub carbon_budget: f64,
    /// Public health, 0 to 100.
    pub health_index: f64,
    /// Respiratory risk, 0 to 100.
    pub respiratory_risk: f64,
    /// Inequality, 0 to 100.
    pub social_inequality: f64,
    /// Happiness, 0 to 100.
    pub happiness_index: f64,
}

/// Rounds to 2 decimal places, halves away from zero.
///
/// This is scaled rounding, not correctly rounded decimal rounding: the
/// binary value nearest 8.675 lies just below it, yet `8.675 * 100.0` is
/// exactly `867.5`, so the result is `8.68`. Exact ties like `0.125` also go
/// up rather than to even.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamps into `[0, 100]`.
#[must_use]
pub fn clamp_index(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Clamps to `>= 0`.
#[must_use]
pub fn clamp_non_negative(value: f64) -> f64 {
    value.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(-0.004), -0.0);
        assert_eq!(round2(114.0), 114.0);
    }

    #[test]
    fn round2_scales_before_rounding() {
        // Stored below 8.675, but the scaled product is an exact half.
        assert_eq!(round2(8.675), 8.68);
        // Exact ties go away from zero, not to even.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }

    #[test]
    fn clamps_hold_their_ranges() {
        assert_eq!(clamp_index(-3.0), 0.0);
        assert_eq!(clamp_index(250.0), 100.0);
        assert_eq!(clamp_index(42.5), 42.5);
        assert_eq!(clamp_non_negative(-1e9), 0.0);
        assert_eq!(clamp_non_negative(1e9), 1e9);
    }
}
