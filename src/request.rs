//! Request and response envelopes for the prediction surface.
//!
//! The engine itself does not validate baseline ranges; these envelopes
//! guard the service boundary against malformed or adversarial JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::UserActions;
use crate::advisor::ChatContext;
use crate::error::ValidationError;
use crate::locality::BaselineStats;
use crate::timepoint::TimePoint;

/// Conservative upper bound for free-form text fields.
pub const MAX_TEXT_LEN: usize = 16 * 1024;

/// Horizon used when a request omits one.
pub const DEFAULT_HORIZON_YEARS: u32 = 20;

/// Largest horizon accepted by default.
pub const MAX_HORIZON_YEARS: u32 = 200;

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_YEARS
}

fn validate_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if v.len() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// A request to project a locality's future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Correlation ID; generated when absent.
    #[serde(default = "Uuid::new_v4")]
    pub request_id: Uuid,

    /// Display name of the locality (usually the city).
    pub locality: String,

    /// Measurements the projection starts from.
    pub baseline: BaselineStats,

    /// Policy levers; all off when omitted.
    #[serde(default)]
    pub actions: UserActions,

    /// Number of years to project, starting the year after the baseline.
    #[serde(default = "default_horizon")]
    pub time_horizon_years: u32,

    /// Makes history noise reproducible for this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_key: Option<String>,
}

impl PredictionRequest {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> PredictionBuilder {
        PredictionBuilder::new()
    }

    /// Validate the request against a horizon ceiling.
    pub fn validate(&self, max_horizon_years: u32) -> Result<(), ValidationError> {
        validate_text("locality", &self.locality)?;
        if let Some(key) = &self.seed_key {
            validate_text("seed_key", key)?;
        }
        if self.time_horizon_years == 0 || self.time_horizon_years > max_horizon_years {
            return Err(ValidationError::HorizonOutOfRange {
                value: self.time_horizon_years,
                min: 1,
                max: max_horizon_years,
            });
        }
        self.baseline.validate()
    }
}

/// Fluent builder for [`PredictionRequest`].
///
/// ```
/// use localitytwin::{BaselineStats, FactoryType, PredictionRequest, UserActions};
///
/// let request = PredictionRequest::builder()
///     .locality("Kochi")
///     .baseline(BaselineStats::new(95.0, 50.0, 80.0, 800.0, 600_000))
///     .actions(UserActions::none().with_factory(FactoryType::Textile))
///     .horizon(10)
///     .build()
///     .unwrap();
/// assert_eq!(request.time_horizon_years, 10);
/// ```
///
/// `build` checks the horizon against [`MAX_HORIZON_YEARS`] unless
/// [`PredictionBuilder::max_horizon`] raises or lowers the ceiling, e.g. to
/// match an engine's [`EngineConfig::max_horizon_years`](crate::EngineConfig).
#[derive(Debug, Clone, Default)]
pub struct PredictionBuilder {
    locality: Option<String>,
    baseline: Option<BaselineStats>,
    actions: Option<UserActions>,
    horizon: Option<u32>,
    max_horizon: Option<u32>,
    seed_key: Option<String>,
}

impl PredictionBuilder {
    /// Empty builder; `locality` and `baseline` are required.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name of the locality.
    #[must_use]
    pub fn locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    /// Starting measurements.
    #[must_use]
    pub fn baseline(mut self, baseline: BaselineStats) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Policy levers. Defaults to none.
    #[must_use]
    pub fn actions(mut self, actions: UserActions) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Years to project. Defaults to [`DEFAULT_HORIZON_YEARS`].
    #[must_use]
    pub fn horizon(mut self, years: u32) -> Self {
        self.horizon = Some(years);
        self
    }

    /// Horizon ceiling `build` validates against.
    #[must_use]
    pub fn max_horizon(mut self, years: u32) -> Self {
        self.max_horizon = Some(years);
        self
    }

    /// Makes the history noise reproducible.
    #[must_use]
    pub fn seed_key(mut self, key: impl Into<String>) -> Self {
        self.seed_key = Some(key.into());
        self
    }

    /// Build and validate the request.
    pub fn build(self) -> Result<PredictionRequest, ValidationError> {
        let locality = self.locality.ok_or_else(|| ValidationError::MissingField {
            field: "locality".to_string(),
        })?;
        let baseline = self.baseline.ok_or_else(|| ValidationError::MissingField {
            field: "baseline".to_string(),
        })?;

        let request = PredictionRequest {
            request_id: Uuid::new_v4(),
            locality,
            baseline,
            actions: self.actions.unwrap_or_default(),
            time_horizon_years: self.horizon.unwrap_or(DEFAULT_HORIZON_YEARS),
            seed_key: self.seed_key,
        };
        request.validate(self.max_horizon.unwrap_or(MAX_HORIZON_YEARS))?;
        Ok(request)
    }
}

/// Result of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Fresh ID for this result.
    pub prediction_id: Uuid,
    /// Echoes [`PredictionRequest::request_id`].
    pub request_id: Uuid,
    /// Locality name from the request.
    pub locality: String,
    /// One snapshot per projected year, oldest first.
    pub predictions: Vec<TimePoint>,
    /// One line per triggered action.
    pub explanations: Vec<String>,
    /// Trees needed to reach the happiness target.
    pub trees_to_plant_for_happiness: u64,
    /// When the response was produced.
    pub generated_at: DateTime<Utc>,
}

impl PredictionResponse {
    /// The last projected year, if any.
    #[must_use]
    pub fn final_point(&self) -> Option<&TimePoint> {
        self.predictions.last()
    }
}

/// A question for the city advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Free-text question.
    pub message: String,
    /// Latest prediction the question refers to.
    #[serde(default)]
    pub context: ChatContext,
}

impl ChatRequest {
    /// Rejects empty or oversized messages.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("message", &self.message)
    }
}
