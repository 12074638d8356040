//! Request handlers for the serving API

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{error::ServerError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// Flat numeric feature vector in training column order.
    pub features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub withdrawal_predicted: bool,
    pub probability: f64,
    pub model: String,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "healthy",
        "model": state.model_name,
        "uptime_secs": uptime.num_seconds(),
    }))
}

/// GET /api/model/info
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let summary = state.adapter.summary();
    Json(json!({
        "model": summary,
        "feature_columns": state.feature_info.feature_columns,
        "numerical_columns": state.feature_info.numerical_columns,
        "categorical_columns": state.feature_info.categorical_columns,
        "behavioral_thresholds": state.feature_info.behavioral_thresholds,
    }))
}

/// POST /api/predict
///
/// Rejects wrong-length vectors with 400 before touching the model, with
/// the expected and received feature counts in the message.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ServerError> {
    if request.features.iter().any(|v| !v.is_finite()) {
        return Err(ServerError::BadRequest(
            "feature vector contains non-finite values".to_string(),
        ));
    }

    let (label, probability) = state.adapter.predict_one(&request.features)?;
    debug!(
        model = %state.model_name,
        probability = format!("{:.4}", probability),
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        withdrawal_predicted: label == 1,
        probability,
        model: state.model_name.clone(),
    }))
}
