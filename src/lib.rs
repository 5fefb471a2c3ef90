//! # LocalityTwin - environmental digital twin for small localities
//!
//! LocalityTwin projects how a city's air, water, carbon budget, health and
//! happiness evolve over a multi-year horizon under a set of user-chosen
//! interventions (factories, solar, tree planting or cutting, waste
//! management, public transport, green policy).
//!
//! ## Pipeline
//!
//! - **History**: ten years of noisy synthetic history around the baseline
//! - **Trends**: least-squares slopes for AQI, water quality and carbon budget
//! - **Impacts**: per-action deltas plus human-readable explanations
//! - **Projection**: year-by-year state evolution with derived indices
//! - **Remediation**: trees needed to bring happiness back to target
//!
//! ## Usage
//!
//! ```rust
//! use localitytwin::{BaselineStats, FactoryType, PredictionEngine, UserActions};
//!
//! let engine = PredictionEngine::default();
//! let kochi = BaselineStats::new(95.0, 50.0, 80.0, 800.0, 600_000);
//! let actions = UserActions::none()
//!     .with_factory(FactoryType::Chemical)
//!     .with_trees_planted(100)
//!     .with_solar();
//!
//! let prediction = engine.predict(&kochi, &actions, 20)?;
//! assert_eq!(prediction.predictions.len(), 20);
//! assert_eq!(prediction.explanations.len(), 3);
//! # Ok::<(), localitytwin::TwinError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod actions;
pub mod config;
pub mod error;
pub mod locality;
pub mod noise;
pub mod timepoint;

// Engine, catalog and request surface
pub mod advisor;
pub mod engine;
pub mod request;
pub mod storage;

#[cfg(feature = "transport-grpc")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use actions::{FactoryType, UserActions};
pub use advisor::{ChatContext, CityAdvisor, Topic};
pub use config::EngineConfig;
pub use engine::{
    ExecutionPath, JobHandle, Prediction, PredictionEngine, ProjectionStream, TrendSlopes, TwinJob,
    TwinOutput, TwinRuntime, TwinRuntimeConfig,
};
pub use error::{ExecutionError, TwinError, TwinResult, ValidationError};
pub use locality::{BaselineStats, Locality};
pub use noise::{GaussianNoise, NoiseSource, ZeroNoise};
pub use request::{ChatRequest, PredictionBuilder, PredictionRequest, PredictionResponse};
pub use storage::{InMemoryLocalityStore, LocalityHierarchy, LocalityStore, StorageError};
pub use timepoint::TimePoint;
