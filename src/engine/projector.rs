//! Year-by-year state projection.
//!
//! Each step updates the primary metrics (aqi, water, carbon) from half the
//! fitted slope plus the impact delta, clamps them, and only then derives
//! the secondary indices from the updated values. Years are strictly
//! sequential: each one reads the previous year's clamped state.

use serde::{Deserialize, Serialize};

use crate::engine::impact::ImpactBundle;
use crate::engine::trend::TrendSlopes;
use crate::locality::BaselineStats;
use crate::timepoint::{clamp_index, clamp_non_negative, round2, TimePoint, POLLUTION_PER_AQI};

/// Weight applied to fitted slopes (a damped nudge, not a forecast).
pub const SLOPE_WEIGHT: f64 = 0.5;

/// Social inequality every projection starts from.
pub const INITIAL_INEQUALITY: f64 = 50.0;

/// State carried from one projected year to the next.
///
/// `inequality` accumulates the impact term and is clamped in place, so the
/// clamped value is what the following year builds on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionState {
    /// Unrounded AQI, floored at zero.
    pub aqi: f64,
    /// Unrounded water quality in `[0, 100]`.
    pub water: f64,
    /// Unrounded carbon budget, floored at zero.
    pub carbon: f64,
    /// Clamped inequality accumulator.
    pub inequality: f64,
}

impl ProjectionState {
    /// Starting state for a baseline.
    #[must_use]
    pub const fn from_baseline(baseline: &BaselineStats) -> Self {
        Self {
            aqi: baseline.aqi,
            water: baseline.water_quality,
            carbon: baseline.carbon_budget,
            inequality: INITIAL_INEQUALITY,
        }
    }

    /// Advances one year and returns that year's snapshot.
    pub fn step(&mut self, year: i32, impact: &ImpactBundle, slopes: &TrendSlopes) -> TimePoint {
        self.aqi = clamp_non_negative(self.aqi + SLOPE_WEIGHT * slopes.aqi + impact.aqi_change);
        self.water = clamp_index(self.water + SLOPE_WEIGHT * slopes.water + impact.water_change);
        self.carbon = clamp_non_negative(self.carbon + SLOPE_WEIGHT * slopes.carbon + impact.carbon_change);

        let raw_health = 50.0 + 0.3 * self.water - 0.2 * self.aqi + impact.health_impact;
        // Respiratory risk reads health before it is clamped.
        let respiratory_risk = clamp_index(self.aqi / 5.0 - raw_health / 10.0);
        let health = clamp_index(raw_health);

        self.inequality = clamp_index(self.inequality + impact.inequality_impact);

        let happiness = clamp_index(
            50.0 + 0.3 * health - 0.3 * self.inequality - 0.1 * self.aqi + impact.happiness_base,
        );

        TimePoint {
            year,
            aqi: round2(self.aqi),
            water_quality: round2(self.water),
            pollution_index: round2(self.aqi * POLLUTION_PER_AQI),
            carbon_budget: round2(self.carbon),
            health_index: round2(health),
            respiratory_risk: round2(respiratory_risk),
            social_inequality: round2(self.inequality),
            happiness_index: round2(happiness),
        }
    }
}

/// Lazy projection over a horizon; yields one [`TimePoint`] per year.
///
/// ```
/// use localitytwin::engine::{calculate_impacts, Projection, TrendSlopes};
/// use localitytwin::{BaselineStats, UserActions};
///
/// let baseline = BaselineStats::new(60.0, 70.0, 30.0, 1500.0, 80_000);
/// let impact = calculate_impacts(&UserActions::none());
/// let points: Vec<_> = Projection::new(&baseline, &impact, TrendSlopes::default(), 2025, 3).collect();
/// assert_eq!(points.len(), 3);
/// assert_eq!(points[0].year, 2026);
/// ```
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    impact: &'a ImpactBundle,
    slopes: TrendSlopes,
    state: ProjectionState,
    current_year: i32,
    next: u32,
    horizon: u32,
}

impl<'a> Projection<'a> {
    /// Projection of `horizon` years after `current_year`.
    #[must_use]
    pub fn new(
        baseline: &BaselineStats,
        impact: &'a ImpactBundle,
        slopes: TrendSlopes,
        current_year: i32,
        horizon: u32,
    ) -> Self {
        Self {
            impact,
            slopes,
            state: ProjectionState::from_baseline(baseline),
            current_year,
            next: 1,
            horizon,
        }
    }

    /// State after the most recently yielded year.
    #[must_use]
    pub const fn state(&self) -> &ProjectionState {
        &self.state
    }
}

impl Iterator for Projection<'_> {
    type Item = TimePoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.horizon {
            return None;
        }
        let offset = i32::try_from(self.next).ok()?;
        let year = self.current_year.checked_add(offset)?;
        self.next += 1;
        Some(self.state.step(year, self.impact, &self.slopes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.horizon + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}
