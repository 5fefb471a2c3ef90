//! Engine configuration.
//!
//! Defaults reproduce the product's fixed constants. Every field can be
//! overridden from JSON (missing fields fall back to the defaults).

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::request::MAX_HORIZON_YEARS;

/// Tunables for [`crate::engine::PredictionEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Year the baseline was measured in. Projections start the year after.
    pub current_year: i32,

    /// Number of synthetic past years generated for the trend fit.
    pub history_years: u32,

    /// Upper bound accepted for a request horizon.
    pub max_horizon_years: u32,

    /// Final happiness at or above this needs no remediation.
    pub happiness_target: f64,

    /// Trees recommended per happiness point of deficit.
    pub trees_per_happiness_point: f64,

    /// Extra trees recommended per tree already cut.
    pub cut_tree_penalty: f64,

    /// Fixed seed for history noise. `None` draws fresh entropy per call.
    pub noise_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            current_year: 2025,
            history_years: 10,
            max_horizon_years: MAX_HORIZON_YEARS,
            happiness_target: 70.0,
            trees_per_happiness_point: 60.0,
            cut_tree_penalty: 1.5,
            noise_seed: None,
        }
    }
}

impl EngineConfig {
    /// Uses the wall-clock year as the baseline year.
    #[must_use]
    pub fn with_current_year_from_clock(mut self) -> Self {
        self.current_year = Utc::now().year();
        self
    }

    /// Sets the baseline year.
    #[must_use]
    pub const fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Fixes the history noise seed.
    #[must_use]
    pub const fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    /// Sets the largest horizon requests may ask for.
    #[must_use]
    pub const fn with_max_horizon_years(mut self, years: u32) -> Self {
        self.max_horizon_years = years;
        self
    }

    /// Validate configuration.
    ///
    /// Must be called before constructing an engine from untrusted input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_years == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "history_years must be > 0".to_string(),
            });
        }
        if self.max_horizon_years == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "max_horizon_years must be > 0".to_string(),
            });
        }
        for (name, value) in [
            ("happiness_target", self.happiness_target),
            ("trees_per_happiness_point", self.trees_per_happiness_point),
            ("cut_tree_penalty", self.cut_tree_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("{name} must be a finite non-negative number"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn config_rejects_zero_history_and_bad_horizons() {
        let mut c = EngineConfig::default();
        c.history_years = 0;
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.max_horizon_years = 0;
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.cut_tree_penalty = f64::INFINITY;
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let c: EngineConfig = serde_json::from_str(r#"{"current_year": 2030}"#).unwrap();
        assert_eq!(c.current_year, 2030);
        assert_eq!(c.history_years, 10);
        assert_eq!(c.happiness_target, 70.0);
        assert!(c.noise_seed.is_none());
    }

    #[test]
    fn clock_year_is_plausible() {
        let c = EngineConfig::default().with_current_year_from_clock();
        assert!(c.current_year >= 2024);
    }
}
