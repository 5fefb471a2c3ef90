//! Error types for LocalityTwin.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on specific conditions. The service boundary only needs the
//! message; it maps everything that is not a validation or lookup failure
//! to an internal error.

use thiserror::Error;

/// Validation errors raised while checking requests and configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Requested horizon outside the accepted range.
    #[error("Time horizon {value} is out of range [{min}, {max}]")]
    HorizonOutOfRange {
        /// Requested years.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// A required field is absent or blank.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Dotted field path.
        field: String,
    },

    /// A text field is too long.
    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        /// Dotted field path.
        field: String,
        /// Limit in bytes.
        max_length: usize,
    },

    /// A numeric field is NaN or infinite.
    #[error("Field '{field}' must be a finite number, got {value}")]
    NonFinite {
        /// Field name.
        field: String,
        /// Offending value.
        value: f64,
    },

    /// Engine configuration rejected by `EngineConfig::validate`.
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

/// Execution errors raised by the engine, the catalog, and the runtime.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Too few distinct years for a regression.
    #[error("Trend fit needs at least 2 distinct years, got {distinct_years}")]
    DegenerateFit {
        /// Distinct years in the history.
        distinct_years: usize,
    },

    /// Zero-year horizon reached the engine.
    #[error("Projection produced no time points (horizon {horizon})")]
    EmptyProjection {
        /// Requested horizon.
        horizon: u32,
    },

    /// No city or district with that name.
    #[error("Locality not found: {name}")]
    LocalityNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A job did not finish in time.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// Time waited.
        duration_ms: u64,
    },

    /// A worker pool queue is full.
    #[error("Execution queue full for path '{path}' (capacity: {capacity})")]
    QueueFull {
        /// Pool label.
        path: String,
        /// Queue capacity.
        capacity: usize,
    },

    /// A worker pool has shut down.
    #[error("Execution path '{path}' is disconnected")]
    Disconnected {
        /// Pool label.
        path: String,
    },

    /// Catalog backend failure.
    #[error("Catalog error: {message}")]
    Catalog {
        /// Backend message.
        message: String,
    },
}

/// Top-level error type for LocalityTwin.
#[derive(Debug, Error)]
pub enum TwinError {
    /// Bad input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure while running a job.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Unexpected failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl TwinError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this is a locality lookup miss.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::LocalityNotFound { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// The engine is pure computation, so only runtime backpressure is
    /// worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::Timeout { .. } | ExecutionError::QueueFull { .. }
            ),
        }
    }
}

/// Result type alias for LocalityTwin operations.
pub type TwinResult<T> = Result<T, TwinError>;
