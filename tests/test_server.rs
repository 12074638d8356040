//! Integration test: serving API endpoints

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use polars::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

use retention_ml::artifacts::ArtifactStore;
use retention_ml::features::FeatureInfo;
use retention_ml::model::{EstimatorKind, ModelAdapter};
use retention_ml::server::{create_router, AppState};

/// Train a tiny model into a temp artifact store and build the router on it.
fn test_app() -> (tempfile::TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let clicks: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 300.0 } else { 10.0 + i as f64 }).collect();
    let credits: Vec<f64> = (0..40).map(|i| 60.0 + (i % 4) as f64 * 30.0).collect();
    let labels: Vec<i32> = (0..40).map(|i| (i % 2) as i32).collect();
    let df = df!("total_clicks" => clicks, "studied_credits" => credits).unwrap();
    let target = Series::new("target".into(), labels);

    let mut adapter = ModelAdapter::new(EstimatorKind::Logistic);
    adapter.train(&df, &target).unwrap();
    adapter.save(&store.model_path("logistic_regression")).unwrap();

    store
        .save_feature_info(&FeatureInfo {
            feature_columns: vec!["total_clicks".to_string(), "studied_credits".to_string()],
            numerical_columns: vec!["total_clicks".to_string(), "studied_credits".to_string()],
            categorical_columns: Vec::new(),
            behavioral_thresholds: BTreeMap::new(),
        })
        .unwrap();

    let state = Arc::new(AppState::load(&store, "logistic_regression").unwrap());
    (dir, create_router(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "logistic_regression");
}

#[tokio::test]
async fn test_model_info_endpoint() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/model/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["model"]["is_fitted"], true);
    assert_eq!(body["model"]["n_features"], 2);
    assert_eq!(body["feature_columns"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_predict_endpoint() {
    let (_dir, app) = test_app();
    let payload = json!({ "features": [10.0, 120.0] });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["model"], "logistic_regression");
    let p = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
    // Low-activity student should be flagged as likely to withdraw
    assert_eq!(body["withdrawal_predicted"], true);
}

#[tokio::test]
async fn test_predict_wrong_shape_is_400_with_counts() {
    let (_dir, app) = test_app();
    let payload = json!({ "features": [10.0, 120.0, 3.0, 4.0] });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("2 features"), "message: {}", message);
    assert!(message.contains("4 features"), "message: {}", message);
}

#[tokio::test]
async fn test_predict_non_finite_rejected() {
    let (_dir, app) = test_app();
    // JSON has no NaN literal; a null element fails deserialization
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{ "features": [1.0, null] }"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
}
