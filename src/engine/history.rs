//! Synthetic history generation.
//!
//! The product has no measured history for a locality, so a plausible past
//! is fabricated around the baseline purely to give the trend fitter
//! something to regress against. It is never exposed externally.

use serde::{Deserialize, Serialize};

use crate::locality::BaselineStats;
use crate::noise::NoiseSource;

/// AQI was this much lower per year back in time.
const AQI_STEP_PER_YEAR: f64 = 3.0;
/// Water quality was this much higher per year back in time.
const WATER_STEP_PER_YEAR: f64 = 1.0;
/// Carbon budget was this much larger per year back in time.
const CARBON_STEP_PER_YEAR: f64 = 10.0;

const AQI_NOISE_STD: f64 = 2.0;
const WATER_NOISE_STD: f64 = 2.0;
const CARBON_NOISE_STD: f64 = 5.0;

/// One synthetic past year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    /// Past calendar year.
    pub year: i32,
    /// Noisy AQI.
    pub aqi: f64,
    /// Noisy water quality.
    pub water_quality: f64,
    /// Noisy carbon budget.
    pub carbon_budget: f64,
}

impl HistoryRow {
    /// The baseline itself as a history row.
    #[must_use]
    pub const fn from_baseline(year: i32, baseline: &BaselineStats) -> Self {
        Self {
            year,
            aqi: baseline.aqi,
            water_quality: baseline.water_quality,
            carbon_budget: baseline.carbon_budget,
        }
    }
}

/// Fabricates `years` past rows plus the baseline row, oldest first.
///
/// The row `k` years back carries `aqi - 3k`, `water + k` and `carbon + 10k`,
/// each perturbed by independent noise (drawn in that order). AQI is floored
/// at zero and water clamped to `[0, 100]`; carbon is left unbounded.
/// The final row is exactly the baseline at `current_year`.
pub fn synthesize_history(
    baseline: &BaselineStats,
    current_year: i32,
    years: u32,
    noise: &mut dyn NoiseSource,
) -> Vec<HistoryRow> {
    let mut rows = Vec::with_capacity(years as usize + 1);

    for back in (1..=years).rev() {
        let k = f64::from(back);
        let year = current_year.saturating_sub(i32::try_from(back).unwrap_or(i32::MAX));

        let aqi = baseline.aqi - AQI_STEP_PER_YEAR * k + noise.gaussian(AQI_NOISE_STD);
        let water = baseline.water_quality + WATER_STEP_PER_YEAR * k + noise.gaussian(WATER_NOISE_STD);
        let carbon = baseline.carbon_budget + CARBON_STEP_PER_YEAR * k + noise.gaussian(CARBON_NOISE_STD);

        rows.push(HistoryRow {
            year,
            aqi: aqi.max(0.0),
            water_quality: water.clamp(0.0, 100.0),
            carbon_budget: carbon,
        });
    }

    rows.push(HistoryRow::from_baseline(current_year, baseline));
    rows
}
