use crate::database::DatabaseError;
use crate::models::AppId;
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store did not answer in time
    #[error("Query timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            _ => RepositoryError::Query(err),
        }
    }
}

/// How a caller should treat a forecast failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The requested game or its data does not exist
    NotFound,
    /// Retrying later may succeed
    Transient,
    /// The service is misconfigured (no usable model)
    Configuration,
}

/// Failures surfaced by the forecast pipeline.
///
/// Every public pipeline operation returns one of these instead of leaking
/// I/O, deserialization or numeric errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// No artifact has ever been loaded successfully
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Game {0} not found")]
    GameNotFound(AppId),

    #[error("No price history for game {0}")]
    NoPriceHistory(AppId),

    #[error("Insufficient price history for game {appid}: found {found} rows, need {required}")]
    InsufficientHistory {
        appid: AppId,
        found: usize,
        required: usize,
    },

    /// Artifact could not be read or decoded; any active artifact stays in place
    #[error("Failed to load model artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("Internal computation error: {0}")]
    InternalComputation(String),
}

impl ForecastError {
    /// Stable machine-readable name
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::ModelNotLoaded => "model_not_loaded",
            ForecastError::GameNotFound(_) => "game_not_found",
            ForecastError::NoPriceHistory(_) => "no_price_history",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::ArtifactLoad { .. } => "artifact_load_failure",
            ForecastError::InternalComputation(_) => "internal_computation_error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ForecastError::GameNotFound(_)
            | ForecastError::NoPriceHistory(_)
            | ForecastError::InsufficientHistory { .. } => Severity::NotFound,
            ForecastError::ModelNotLoaded | ForecastError::ArtifactLoad { .. } => {
                Severity::Configuration
            }
            ForecastError::InternalComputation(_) => Severity::Transient,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            severity: self.severity(),
            message: self.to_string(),
        }
    }
}

/// Serialisable form of a [`ForecastError`]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub severity: Severity,
    pub message: String,
}
