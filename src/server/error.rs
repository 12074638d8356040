//! Error types for the serving API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::RetentionError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RetentionError> for ServerError {
    fn from(e: RetentionError) -> Self {
        match e {
            // Shape mismatches report expected vs received counts so the
            // client can fix its payload
            RetentionError::ShapeError { expected, actual } => ServerError::BadRequest(format!(
                "feature vector shape mismatch: expected {}, received {}",
                expected, actual
            )),
            RetentionError::MissingColumn(c) => {
                ServerError::BadRequest(format!("missing column: {}", c))
            }
            RetentionError::ValidationError(m) | RetentionError::DataError(m) => {
                ServerError::BadRequest(m)
            }
            RetentionError::ModelNotFitted => {
                ServerError::Unavailable("no trained model is loaded".to_string())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}
