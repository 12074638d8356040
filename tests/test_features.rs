//! Integration tests for feature engineering on realistic student tables

use polars::prelude::*;
use retention_ml::features::FeatureEngineer;
use retention_ml::RetentionError;

fn student_frame() -> DataFrame {
    df!(
        "id_student" => &[1i64, 2, 3, 4, 5, 6],
        "code_module" => &["AAA", "AAA", "BBB", "BBB", "CCC", "CCC"],
        "code_presentation" => &["2013J"; 6],
        "final_result" => &["Withdrawn", "Pass", "Fail", "Withdrawn", "Distinction", "Pass"],
        "gender" => &[Some("M"), Some("F"), None, Some("F"), Some("M"), Some("M")],
        "imd_band" => &[Some("0-10%"), Some("90-100%"), None, Some("20-30%"), Some("50-60%"), Some("0-10%")],
        "num_of_prev_attempts" => &[0i64, 1, 2, 0, 0, 3],
        "studied_credits" => &[60i64, 120, 150, 30, 120, 90],
        "date_registration" => &[Some(-30i64), Some(-100), Some(5), None, Some(0), Some(-7)],
        "date_unregistration" => &[Some(45i64), None, None, Some(12), None, None]
    )
    .unwrap()
}

fn interaction_frame() -> DataFrame {
    df!(
        "id_student" => &[1i64, 2, 4, 5],
        "total_clicks" => &[10i64, 500, 40, 300],
        "n_interactions" => &[5i64, 80, 12, 60],
        "n_activity_types" => &[2i64, 9, 3, 7],
        "avg_clicks_per_interaction" => &[2.0, 6.25, 3.3, 5.0]
    )
    .unwrap()
}

#[test]
fn test_prepare_features_full_stack() {
    let mut engineer = FeatureEngineer::new();
    let (features, target) = engineer
        .prepare_features(&student_frame(), Some(&interaction_frame()))
        .unwrap();

    assert_eq!(features.height(), 6);
    // Label source never survives as a feature
    assert!(features.column("final_result").is_err());

    // Target is aligned and binary: rows 1 and 4 withdrew
    let values: Vec<i32> = target.i32().unwrap().into_no_null_iter().collect();
    assert_eq!(values, vec![1, 0, 0, 1, 0, 0]);

    // One-hot carries an explicit missing indicator
    let missing: Vec<i32> = features
        .column("gender_missing")
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(missing, vec![0, 0, 1, 0, 0, 0]);

    // Deprivation band maps to its ordinal rank, null preserved
    let imd = features.column("imd_band_numeric").unwrap();
    let imd: Vec<Option<i32>> = imd.i32().unwrap().into_iter().collect();
    assert_eq!(imd[0], Some(1));
    assert_eq!(imd[1], Some(10));
    assert_eq!(imd[2], None);

    // Full-time cutoff at 120 credits
    let full_time: Vec<i32> = features
        .column("is_full_time")
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(full_time, vec![0, 1, 1, 0, 1, 0]);

    // Unregistration day kept raw, with "never unregistered" encoded as -1
    let unreg = features.column("unregistration_week").unwrap();
    assert_eq!(unreg.null_count(), 0);
    let unreg: Vec<i64> = unreg.i64().unwrap().into_no_null_iter().collect();
    assert_eq!(unreg[0], 45);
    assert_eq!(unreg[1], -1);
}

#[test]
fn test_behavioral_thresholds_frozen_for_inference() {
    let mut engineer = FeatureEngineer::new();
    let (train_features, _) = engineer
        .prepare_features(&student_frame(), Some(&interaction_frame()))
        .unwrap();
    let info = engineer.feature_info().unwrap().clone();

    assert!(info.behavioral_thresholds.contains_key("total_clicks"));

    // A skewed inference batch must be cut at the training medians, not its own
    let new_students = df!(
        "id_student" => &[7i64, 8],
        "code_module" => &["AAA", "AAA"],
        "code_presentation" => &["2014B", "2014B"],
        "final_result" => &["Pass", "Pass"],
        "studied_credits" => &[60i64, 120]
    )
    .unwrap();
    let new_interactions = df!(
        "id_student" => &[7i64, 8],
        "total_clicks" => &[100_000i64, 200_000],
        "n_interactions" => &[1000i64, 2000],
        "n_activity_types" => &[10i64, 12],
        "avg_clicks_per_interaction" => &[100.0, 100.0]
    )
    .unwrap();

    let scored = engineer
        .transform_with_info(&new_students, Some(&new_interactions), &info)
        .unwrap();

    // Both rows sit far above the frozen training medians
    let high: Vec<i32> = scored
        .column("high_activity")
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(high, vec![1, 1]);
    assert!(scored.column("final_result").is_err());
    assert_eq!(train_features.height(), 6);
}

#[test]
fn test_missing_interactions_skips_behavioral_columns() {
    let mut engineer = FeatureEngineer::new();
    let (features, _) = engineer.prepare_features(&student_frame(), None).unwrap();

    assert!(features.column("total_clicks").is_err());
    assert!(features.column("high_activity").is_err());
    assert!(engineer
        .feature_info()
        .unwrap()
        .behavioral_thresholds
        .is_empty());
}

#[test]
fn test_missing_target_column_fails_fast() {
    let df = df!(
        "id_student" => &[1i64, 2],
        "code_module" => &["AAA", "AAA"],
        "code_presentation" => &["2013J", "2013J"],
        "studied_credits" => &[60i64, 120]
    )
    .unwrap();

    let mut engineer = FeatureEngineer::new();
    let err = engineer.prepare_features(&df, None).unwrap_err();
    assert!(matches!(err, RetentionError::MissingTargetColumn(_)));
}

#[test]
fn test_feature_info_records_column_partition() {
    let mut engineer = FeatureEngineer::new();
    engineer
        .prepare_features(&student_frame(), Some(&interaction_frame()))
        .unwrap();
    let info = engineer.feature_info().unwrap();

    assert!(!info.feature_columns.is_empty());
    assert_eq!(
        info.feature_columns.len(),
        info.numerical_columns.len() + info.categorical_columns.len()
    );
    assert!(info
        .numerical_columns
        .contains(&"studied_credits".to_string()));
}
