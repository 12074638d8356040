//! Error types for the retention-ml pipeline

use thiserror::Error;

/// Result type alias for retention-ml operations
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Main error type for the retention-ml pipeline
#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error: required column '{0}' is missing")]
    MissingColumn(String),

    #[error("Target column '{0}' not found in input table")]
    MissingTargetColumn(String),

    #[error("Feature engineering error: {0}")]
    FeatureError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Target has fewer than 2 classes: {0}")]
    DegenerateTarget(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for RetentionError {
    fn from(err: polars::error::PolarsError) -> Self {
        RetentionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RetentionError {
    fn from(err: serde_json::Error) -> Self {
        RetentionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RetentionError {
    fn from(err: ndarray::ShapeError) -> Self {
        RetentionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
