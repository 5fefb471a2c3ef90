//! Locality identity and baseline measurements.
//!
//! A baseline is the fixed starting measurement set for a locality before
//! any simulated years elapse. The engine never mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Position of a city in the country / state / district / city hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locality {
    /// Country name.
    pub country: String,
    /// State or province.
    pub state: String,
    /// District within the state.
    pub district: String,
    /// City within the district.
    pub city: String,
}

impl Locality {
    /// Creates a locality record.
    #[must_use]
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        district: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            district: district.into(),
            city: city.into(),
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.city, self.district, self.state, self.country
        )
    }
}

/// Starting condition of a locality.
///
/// Ranges are advisory: the engine does not reject out-of-range values,
/// it clamps projected values instead.
///
/// # Examples
///
/// ```
/// use localitytwin::BaselineStats;
///
/// let kochi = BaselineStats::new(95.0, 50.0, 80.0, 800.0, 600_000);
/// assert_eq!(kochi.water_quality, 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    /// Air quality index (>= 0).
    pub aqi: f64,

    /// Water quality index (0-100).
    pub water_quality: f64,

    /// General pollution index (>= 0).
    pub pollution_index: f64,

    /// Remaining carbon budget (>= 0, arbitrary units).
    pub carbon_budget: f64,

    /// Population size.
    pub population: u64,
}

impl BaselineStats {
    /// Creates a baseline.
    #[must_use]
    pub const fn new(
        aqi: f64,
        water_quality: f64,
        pollution_index: f64,
        carbon_budget: f64,
        population: u64,
    ) -> Self {
        Self {
            aqi,
            water_quality,
            pollution_index,
            carbon_budget,
            population,
        }
    }

    /// Rejects NaN and infinite measurements.
    ///
    /// Range violations are not rejected here; the projector clamps them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("baseline.aqi", self.aqi),
            ("baseline.water_quality", self.water_quality),
            ("baseline.pollution_index", self.pollution_index),
            ("baseline.carbon_budget", self.carbon_budget),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}
