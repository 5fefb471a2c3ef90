//! Prediction engine.
//!
//! Pipeline: synthesize history → fit trends → compute impacts → project
//! year by year → estimate remediation. The engine holds only immutable
//! configuration, so one instance can serve concurrent callers; all
//! per-call state lives on the stack of the call.

pub mod history;
pub mod impact;
pub mod projector;
pub mod remediation;
pub mod runtime;
pub mod trend;

pub use history::{synthesize_history, HistoryRow};
pub use impact::{calculate_impacts, ImpactBundle};
pub use projector::{Projection, ProjectionState};
pub use remediation::recommend_trees;
pub use runtime::{
    ExecutionPath, JobHandle, ProjectionStream, TwinJob, TwinOutput, TwinRuntime, TwinRuntimeConfig,
};
pub use trend::{fit_trends, TrendSlopes};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::actions::UserActions;
use crate::config::EngineConfig;
use crate::error::{ExecutionError, TwinResult, ValidationError};
use crate::locality::BaselineStats;
use crate::noise::{GaussianNoise, NoiseSource};
use crate::request::{PredictionRequest, PredictionResponse};
use crate::timepoint::TimePoint;

/// Output of one prediction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// One snapshot per projected year, oldest first.
    pub predictions: Vec<TimePoint>,
    /// One explanation per triggered action.
    pub explanations: Vec<String>,
    /// Advisory tree count to reach the happiness target.
    pub trees_to_plant_for_happiness: u64,
    /// Slopes the projection was driven by.
    pub slopes: TrendSlopes,
}

impl Prediction {
    /// The last projected year.
    #[must_use]
    pub fn final_point(&self) -> Option<&TimePoint> {
        self.predictions.last()
    }
}

/// Synchronous, reentrant prediction engine.
#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    config: EngineConfig,
}

impl PredictionEngine {
    /// Create an engine with validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Noise source for one call.
    ///
    /// A request key wins over the configured seed; with neither, fresh
    /// entropy is drawn.
    #[must_use]
    pub fn noise_for(&self, seed_key: Option<&str>) -> GaussianNoise {
        match (seed_key, self.config.noise_seed) {
            (Some(key), _) => GaussianNoise::keyed(key),
            (None, Some(seed)) => GaussianNoise::seeded(seed),
            (None, None) => GaussianNoise::from_entropy(),
        }
    }

    /// Synthesizes history for `baseline` and fits the trend slopes.
    pub fn fit_trends(
        &self,
        baseline: &BaselineStats,
        noise: &mut dyn NoiseSource,
    ) -> TwinResult<TrendSlopes> {
        let history = synthesize_history(
            baseline,
            self.config.current_year,
            self.config.history_years,
            noise,
        );
        let slopes = fit_trends(&history)?;
        debug!(
            aqi_slope = slopes.aqi,
            water_slope = slopes.water,
            carbon_slope = slopes.carbon,
            rows = history.len(),
            "fitted trend slopes"
        );
        Ok(slopes)
    }

    /// Lazy year-by-year projection for already computed inputs.
    #[must_use]
    pub fn project<'a>(
        &self,
        baseline: &BaselineStats,
        impact: &'a ImpactBundle,
        slopes: TrendSlopes,
        horizon: u32,
    ) -> Projection<'a> {
        Projection::new(baseline, impact, slopes, self.config.current_year, horizon)
    }

    /// Full pipeline with noise chosen by [`Self::noise_for`].
    pub fn predict(
        &self,
        baseline: &BaselineStats,
        actions: &UserActions,
        horizon: u32,
    ) -> TwinResult<Prediction> {
        let mut noise = self.noise_for(None);
        self.predict_with_noise(baseline, actions, horizon, &mut noise)
    }

    /// Full pipeline with caller-supplied noise.
    pub fn predict_with_noise(
        &self,
        baseline: &BaselineStats,
        actions: &UserActions,
        horizon: u32,
        noise: &mut dyn NoiseSource,
    ) -> TwinResult<Prediction> {
        let slopes = self.fit_trends(baseline, noise)?;
        self.predict_with_slopes(baseline, actions, horizon, slopes)
    }

    /// Projection and remediation for fixed slopes (no randomness).
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::EmptyProjection` when `horizon` is zero,
    /// since there is no final year to estimate remediation from.
    pub fn predict_with_slopes(
        &self,
        baseline: &BaselineStats,
        actions: &UserActions,
        horizon: u32,
        slopes: TrendSlopes,
    ) -> TwinResult<Prediction> {
        let impact = calculate_impacts(actions);
        debug!(?impact, "computed impact bundle");

        let predictions: Vec<TimePoint> = self.project(baseline, &impact, slopes, horizon).collect();
        let last = predictions
            .last()
            .ok_or(ExecutionError::EmptyProjection { horizon })?;
        let trees = recommend_trees(last.happiness_index, actions.trees_cut, &self.config);

        Ok(Prediction {
            predictions,
            explanations: impact.explanations,
            trees_to_plant_for_happiness: trees,
            slopes,
        })
    }

    /// Validates and answers a prediction request.
    pub fn execute(&self, request: &PredictionRequest) -> TwinResult<PredictionResponse> {
        request.validate(self.config.max_horizon_years)?;

        let mut noise = self.noise_for(request.seed_key.as_deref());
        let prediction = self.predict_with_noise(
            &request.baseline,
            &request.actions,
            request.time_horizon_years,
            &mut noise,
        )?;

        info!(
            request_id = %request.request_id,
            locality = %request.locality,
            horizon = request.time_horizon_years,
            trees = prediction.trees_to_plant_for_happiness,
            "prediction complete"
        );

        Ok(PredictionResponse {
            prediction_id: Uuid::new_v4(),
            request_id: request.request_id,
            locality: request.locality.clone(),
            predictions: prediction.predictions,
            explanations: prediction.explanations,
            trees_to_plant_for_happiness: prediction.trees_to_plant_for_happiness,
            generated_at: Utc::now(),
        })
    }
}
