//! Integration tests for model training and evaluation

use polars::prelude::*;
use retention_ml::evaluation::{compare_models, generate_evaluation_report};
use retention_ml::model::{EstimatorKind, ModelAdapter};
use retention_ml::RetentionError;

/// Separable two-cluster frame: even rows stay, odd rows withdraw.
fn training_data(n: usize) -> (DataFrame, Series) {
    let clicks: Vec<f64> = (0..n)
        .map(|i| if i % 2 == 0 { 300.0 + (i % 5) as f64 } else { 20.0 + (i % 5) as f64 })
        .collect();
    let credits: Vec<f64> = (0..n).map(|i| 60.0 + (i % 4) as f64 * 30.0).collect();
    let labels: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();

    let df = df!("total_clicks" => clicks, "studied_credits" => credits).unwrap();
    (df, Series::new("target".into(), labels))
}

#[test]
fn test_all_estimators_learn_separable_data() {
    let (df, target) = training_data(80);

    for kind in [
        EstimatorKind::Logistic,
        EstimatorKind::NaiveBayes,
        EstimatorKind::RandomForest,
    ] {
        let mut adapter = ModelAdapter::new(kind);
        let report = adapter.train(&df, &target).unwrap();
        let metrics = report.metrics;
        assert!(
            metrics.f1_score > 0.9,
            "{} failed to learn: f1={}",
            kind.name(),
            metrics.f1_score
        );
        assert!(metrics.roc_auc > 0.9);
    }
}

#[test]
fn test_training_is_reproducible() {
    let (df, target) = training_data(60);

    let mut a = ModelAdapter::new(EstimatorKind::RandomForest).with_seed(7);
    let mut b = ModelAdapter::new(EstimatorKind::RandomForest).with_seed(7);
    a.train(&df, &target).unwrap();
    b.train(&df, &target).unwrap();

    assert_eq!(a.predict_proba(&df).unwrap(), b.predict_proba(&df).unwrap());
}

#[test]
fn test_degenerate_target_rejected() {
    let df = df!("x" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
    let target = Series::new("target".into(), vec![1i32; 10]);

    let mut adapter = ModelAdapter::new(EstimatorKind::Logistic);
    assert!(adapter.train(&df, &target).is_err());
    assert!(!adapter.is_fitted());
}

#[test]
fn test_cross_validation_scores_bounded() {
    let (df, target) = training_data(100);
    let adapter = ModelAdapter::new(EstimatorKind::Logistic);

    let cv = adapter.cross_validate(&df, &target, 5).unwrap();
    assert_eq!(cv.fold_scores.len(), 5);
    assert!(cv.fold_scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(cv.mean_score > 0.8);
}

#[test]
fn test_report_comparison_end_to_end() {
    let (df, target) = training_data(80);
    let mut reports = Vec::new();

    for kind in [EstimatorKind::Logistic, EstimatorKind::NaiveBayes] {
        let mut adapter = ModelAdapter::new(kind);
        let trained = adapter.train(&df, &target).unwrap();
        let report = generate_evaluation_report(
            kind.name(),
            &trained.holdout.y_true,
            &trained.holdout.y_pred,
            &trained.holdout.y_proba,
            None,
            None,
        )
        .unwrap();
        reports.push(report);
    }

    let rows = compare_models(&reports);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].f1_score >= rows[1].f1_score);
}

#[test]
fn test_unknown_model_name_rejected() {
    let err = "gradient_boosting".parse::<EstimatorKind>().unwrap_err();
    assert!(matches!(err, RetentionError::ConfigError(_)));
}
