//! Ordinary least-squares trend fitting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::history::HistoryRow;
use crate::error::ExecutionError;

/// Per-year rate of change of each primary metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendSlopes {
    /// AQI change per year.
    pub aqi: f64,
    /// Water quality change per year.
    pub water: f64,
    /// Carbon budget change per year.
    pub carbon: f64,
}

impl TrendSlopes {
    /// Slopes from explicit values.
    #[must_use]
    pub const fn new(aqi: f64, water: f64, carbon: f64) -> Self {
        Self { aqi, water, carbon }
    }
}

/// Fits `metric ~ year` independently for aqi, water and carbon and keeps
/// only the slopes.
///
/// # Errors
///
/// Returns `ExecutionError::DegenerateFit` when the rows span fewer than
/// two distinct years.
pub fn fit_trends(history: &[HistoryRow]) -> Result<TrendSlopes, ExecutionError> {
    let distinct_years = history.iter().map(|r| r.year).collect::<BTreeSet<_>>().len();
    if distinct_years < 2 {
        return Err(ExecutionError::DegenerateFit { distinct_years });
    }

    let years: Vec<f64> = history.iter().map(|r| f64::from(r.year)).collect();
    let slope_of = |select: fn(&HistoryRow) -> f64| -> Result<f64, ExecutionError> {
        let values: Vec<f64> = history.iter().map(select).collect();
        ols_slope(&years, &values).ok_or(ExecutionError::DegenerateFit { distinct_years })
    };

    Ok(TrendSlopes {
        aqi: slope_of(|r| r.aqi)?,
        water: slope_of(|r| r.water_quality)?,
        carbon: slope_of(|r| r.carbon_budget)?,
    })
}

/// Closed-form OLS slope: `cov(x, y) / var(x)`.
///
/// Returns `None` for mismatched lengths or zero variance in `xs`.
#[must_use]
pub fn ols_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var = 0.0f64;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }

    if var <= 0.0 {
        return None;
    }
    let slope = cov / var;
    slope.is_finite().then_some(slope)
}
