//! Feature engineering module
//!
//! Deterministic, side-effect-free transformation of the raw student table
//! (plus optional per-student interaction aggregates) into a numeric feature
//! matrix and a binary withdrawal target. Stages run in a fixed order:
//! demographic -> academic -> behavioral -> target extraction. The behavioral
//! stage thresholds on batch medians, so later callers must not reorder the
//! stages; `prepare_features` runs them for training and `transform_with_info`
//! re-runs them for inference against frozen training metadata.

mod academic;
mod behavioral;
mod demographic;

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{StudentSchema, FINAL_RESULT, WITHDRAWN_LABEL};
use crate::error::{RetentionError, Result};

/// Metadata describing the engineered feature matrix.
///
/// Persisted verbatim after training and re-read by inference-time callers so
/// that input ordering is reconstructed exactly: prediction requests supply a
/// flat numeric array matched positionally against `numerical_columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Every column of the feature matrix, in order.
    pub feature_columns: Vec<String>,
    /// The numeric subset, in matrix order.
    pub numerical_columns: Vec<String>,
    /// The categorical (string-typed) subset, in matrix order.
    pub categorical_columns: Vec<String>,
    /// Median thresholds frozen at training time for the behavioral
    /// above-median indicators. Inference reuses these instead of recomputing
    /// medians on the serving batch.
    #[serde(default)]
    pub behavioral_thresholds: BTreeMap<String, f64>,
}

/// One entry of the correlation-based importance ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    pub correlation: f64,
}

/// Feature engineer for the student withdrawal model.
///
/// Holds the declared input schema and, after a `prepare_features` call, the
/// [`FeatureInfo`] describing the matrix it produced.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    schema: StudentSchema,
    info: Option<FeatureInfo>,
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self {
            schema: StudentSchema::default(),
            info: None,
        }
    }

    /// The declared input schema.
    pub fn schema(&self) -> &StudentSchema {
        &self.schema
    }

    /// Feature metadata recorded by the last `prepare_features` call.
    pub fn feature_info(&self) -> Option<&FeatureInfo> {
        self.info.as_ref()
    }

    /// Run the full feature pipeline in fixed order and record
    /// [`FeatureInfo`] for downstream reuse.
    ///
    /// Returns the feature matrix and the aligned binary target (1 =
    /// withdrawn). When `interactions` is `None` the behavioral columns are
    /// absent entirely, not present-but-null.
    pub fn prepare_features(
        &mut self,
        student_df: &DataFrame,
        interactions: Option<&DataFrame>,
    ) -> Result<(DataFrame, Series)> {
        info!(rows = student_df.height(), "Preparing features");

        let df = self.build_demographic_features(student_df)?;
        let df = self.build_academic_features(&df)?;

        let (df, thresholds) = match interactions {
            Some(agg) => self.build_behavioral_features(&df, agg, None)?,
            None => (df, BTreeMap::new()),
        };

        let (features, target) = self.extract_target(&df)?;

        let (numerical, categorical) = partition_columns(&features);
        let info = FeatureInfo {
            feature_columns: features
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            numerical_columns: numerical,
            categorical_columns: categorical,
            behavioral_thresholds: thresholds,
        };

        info!(
            features = info.feature_columns.len(),
            numerical = info.numerical_columns.len(),
            categorical = info.categorical_columns.len(),
            "Feature preparation complete"
        );
        self.info = Some(info);

        Ok((features, target))
    }

    /// Re-run the feature stages on a new batch, reusing behavioral
    /// thresholds frozen at training time.
    ///
    /// Keeps batch-relative indicators (above/below median) consistent
    /// between training and inference populations.
    pub fn transform_with_info(
        &self,
        student_df: &DataFrame,
        interactions: Option<&DataFrame>,
        info: &FeatureInfo,
    ) -> Result<DataFrame> {
        let df = self.build_demographic_features(student_df)?;
        let df = self.build_academic_features(&df)?;

        let df = match interactions {
            Some(agg) => {
                let (df, _) =
                    self.build_behavioral_features(&df, agg, Some(&info.behavioral_thresholds))?;
                df
            }
            None => df,
        };

        // Drop the label source if the batch carries one; inference input
        // must never see it as a feature.
        match df.drop(FINAL_RESULT) {
            Ok(dropped) => Ok(dropped),
            Err(_) => Ok(df),
        }
    }

    /// Construct the binary withdrawal target and remove the label source
    /// column from the feature table.
    ///
    /// The outcome field must never leak into the features; its absence is a
    /// hard schema failure, not a silent partial target.
    pub fn extract_target(&self, df: &DataFrame) -> Result<(DataFrame, Series)> {
        let outcome = df
            .column(FINAL_RESULT)
            .map_err(|_| RetentionError::MissingTargetColumn(FINAL_RESULT.to_string()))?;

        let ca = outcome
            .str()
            .map_err(|e| RetentionError::DataError(e.to_string()))?;

        let values: Vec<i32> = ca
            .into_iter()
            .map(|v| if v == Some(WITHDRAWN_LABEL) { 1 } else { 0 })
            .collect();

        let target = Series::new("target".into(), values);
        let features = df.drop(FINAL_RESULT)?;

        let positives: i32 = target.i32()?.into_iter().flatten().sum();
        info!(
            rows = target.len(),
            withdrawn = positives,
            "Target variable extracted"
        );

        Ok((features, target))
    }

    /// Rank numeric features by |Pearson correlation| against a `target`
    /// column, descending.
    ///
    /// A cheap, model-free importance proxy; returns an empty ranking when no
    /// target column is present.
    pub fn rank_feature_importance(&self, df: &DataFrame) -> Result<Vec<FeatureCorrelation>> {
        let target_col = match df.column("target") {
            Ok(col) => col,
            Err(_) => return Ok(Vec::new()),
        };
        let target = numeric_values(target_col.as_materialized_series())?;

        let mut ranking = Vec::new();
        for col in df.get_columns() {
            let name = col.name().to_string();
            if name == "target" || !col.dtype().is_primitive_numeric() {
                continue;
            }
            let values = numeric_values(col.as_materialized_series())?;
            let corr = pearson(&values, &target);
            ranking.push(FeatureCorrelation {
                feature: name,
                correlation: corr.abs(),
            });
        }

        ranking.sort_by(|a, b| {
            b.correlation
                .partial_cmp(&a.correlation)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ranking)
    }
}

/// Split the feature columns into numeric and categorical (string) subsets,
/// preserving matrix order.
fn partition_columns(df: &DataFrame) -> (Vec<String>, Vec<String>) {
    let mut numerical = Vec::new();
    let mut categorical = Vec::new();

    for col in df.get_columns() {
        let name = col.name().to_string();
        if col.dtype().is_primitive_numeric() {
            numerical.push(name);
        } else {
            categorical.push(name);
        }
    }

    (numerical, categorical)
}

/// Materialize a series as f64 values with nulls mapped to NaN.
fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let ca = series
        .cast(&DataType::Float64)
        .map_err(|e| RetentionError::DataError(e.to_string()))?;
    let ca = ca.f64().map_err(|e| RetentionError::DataError(e.to_string()))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Pearson correlation over pairs where both sides are finite.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();

    let n = pairs.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean_x: f64 = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y: f64 = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
