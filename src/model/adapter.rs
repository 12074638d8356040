//! Model adapter: uniform training/prediction surface over any estimator

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RetentionError, Result};
use crate::evaluation::{calculate_metrics, f1_score, ClassificationMetrics};

use super::cross_validation::{stratified_split, CvMetrics, StratifiedKFold};
use super::estimator::EstimatorKind;
use super::pipeline::FittedPipeline;

/// Fraction of rows held out for the training-time evaluation split.
const HOLDOUT_FRACTION: f64 = 0.2;

/// Holdout-set predictions produced during `train`, kept so the orchestrator
/// can build a full evaluation report without re-predicting.
#[derive(Debug, Clone)]
pub struct HoldoutPredictions {
    pub y_true: Array1<f64>,
    pub y_pred: Array1<f64>,
    pub y_proba: Array1<f64>,
}

/// Result of a `train` call: holdout metrics plus the raw holdout
/// predictions they were computed from.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub metrics: ClassificationMetrics,
    pub holdout: HoldoutPredictions,
    pub n_train: usize,
    pub n_test: usize,
}

/// One row of a model-specific importance ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Descriptive metadata about an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_type: String,
    pub is_fitted: bool,
    pub n_features: Option<usize>,
    pub threshold: f64,
}

/// Persisted form of a fitted adapter. The pipeline is stored whole; there is
/// deliberately no way to write the estimator without its preprocessing state.
#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    kind: EstimatorKind,
    threshold: f64,
    pipeline: FittedPipeline,
}

/// Uniform wrapper around a pluggable binary classifier.
///
/// State machine: Unfitted -> Fitted (one-way; refitting overwrites in
/// place). All prediction operations fail with
/// [`RetentionError::ModelNotFitted`] before a successful `train` or `load`.
#[derive(Debug, Clone)]
pub struct ModelAdapter {
    kind: EstimatorKind,
    seed: u64,
    /// Decision threshold applied to the positive-class probability.
    threshold: f64,
    pipeline: Option<FittedPipeline>,
}

impl ModelAdapter {
    pub fn new(kind: EstimatorKind) -> Self {
        Self {
            kind,
            seed: 42,
            threshold: 0.5,
            pipeline: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn kind(&self) -> EstimatorKind {
        self.kind
    }

    pub fn is_fitted(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Numeric feature names the fitted pipeline expects, in order.
    pub fn feature_names(&self) -> Result<&[String]> {
        self.pipeline
            .as_ref()
            .map(|p| p.feature_names())
            .ok_or(RetentionError::ModelNotFitted)
    }

    /// Train on the numeric subset of `features` with a stratified holdout
    /// split, returning holdout metrics.
    pub fn train(&mut self, features: &DataFrame, target: &Series) -> Result<TrainReport> {
        let (names, x) = numeric_matrix(features)?;
        let y = target_array(target)?;

        if x.nrows() != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{} target values", y.len()),
            });
        }

        let (train_idx, test_idx) = stratified_split(&y, HOLDOUT_FRACTION, self.seed)?;

        let x_train = x.select(ndarray::Axis(0), &train_idx);
        let y_train = Array1::from_vec(train_idx.iter().map(|&i| y[i]).collect());
        let x_test = x.select(ndarray::Axis(0), &test_idx);
        let y_test = Array1::from_vec(test_idx.iter().map(|&i| y[i]).collect());

        info!(
            model = self.kind.name(),
            n_train = x_train.nrows(),
            n_test = x_test.nrows(),
            n_features = x.ncols(),
            "Training model"
        );

        let pipeline = FittedPipeline::fit(self.kind, self.seed, names, &x_train, &y_train)?;

        let y_proba = pipeline.predict_proba(&x_test)?;
        let y_pred = self.binarize(&y_proba);
        let metrics = calculate_metrics(&y_test, &y_pred, &y_proba)?;

        info!(
            model = self.kind.name(),
            f1 = format!("{:.3}", metrics.f1_score),
            roc_auc = format!("{:.3}", metrics.roc_auc),
            "Training complete"
        );

        // Refitting overwrites the previous fit in place
        self.pipeline = Some(pipeline);

        Ok(TrainReport {
            metrics,
            holdout: HoldoutPredictions {
                y_true: y_test,
                y_pred,
                y_proba,
            },
            n_train: train_idx.len(),
            n_test: test_idx.len(),
        })
    }

    /// Stratified k-fold cross-validation scored by F1. Fits throwaway
    /// pipelines per fold; the adapter's own fitted state is untouched.
    pub fn cross_validate(
        &self,
        features: &DataFrame,
        target: &Series,
        folds: usize,
    ) -> Result<CvMetrics> {
        let (names, x) = numeric_matrix(features)?;
        let y = target_array(target)?;

        let splits = StratifiedKFold::new(folds, self.seed).split(&y)?;
        let mut scores = Vec::with_capacity(splits.len());

        for split in &splits {
            let x_train = x.select(ndarray::Axis(0), &split.train_indices);
            let y_train = Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
            let x_test = x.select(ndarray::Axis(0), &split.test_indices);
            let y_test = Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

            let pipeline =
                FittedPipeline::fit(self.kind, self.seed, names.clone(), &x_train, &y_train)?;
            let y_pred = self.binarize(&pipeline.predict_proba(&x_test)?);
            scores.push(f1_score(&y_test, &y_pred));
        }

        let cv = CvMetrics::from_scores(scores);
        info!(
            model = self.kind.name(),
            folds,
            f1_mean = format!("{:.3}", cv.mean_score),
            f1_std = format!("{:.3}", cv.std_score),
            "Cross-validation complete"
        );
        Ok(cv)
    }

    /// Binary labels at the adapter's threshold.
    pub fn predict(&self, features: &DataFrame) -> Result<Array1<f64>> {
        Ok(self.binarize(&self.predict_proba(features)?))
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, features: &DataFrame) -> Result<Array1<f64>> {
        let pipeline = self.pipeline.as_ref().ok_or(RetentionError::ModelNotFitted)?;
        let x = select_matrix(features, pipeline.feature_names())?;
        pipeline.predict_proba(&x)
    }

    /// Predict a single flat feature vector (serving path). The vector length
    /// must match the training-time feature count exactly.
    pub fn predict_one(&self, values: &[f64]) -> Result<(i32, f64)> {
        let pipeline = self.pipeline.as_ref().ok_or(RetentionError::ModelNotFitted)?;

        if values.len() != pipeline.n_features() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} features", pipeline.n_features()),
                actual: format!("{} features", values.len()),
            });
        }

        let x = Array2::from_shape_vec((1, values.len()), values.to_vec())?;
        let proba = pipeline.predict_proba(&x)?;
        let p = proba[0];
        Ok((if p >= self.threshold { 1 } else { 0 }, p))
    }

    /// Model-specific feature importance, descending. `None` when the
    /// underlying algorithm has no importance notion.
    pub fn feature_importance(&self) -> Result<Option<Vec<FeatureImportance>>> {
        let pipeline = self.pipeline.as_ref().ok_or(RetentionError::ModelNotFitted)?;

        let Some(scores) = pipeline.feature_importances() else {
            return Ok(None);
        };

        let mut ranking: Vec<FeatureImportance> = pipeline
            .feature_names()
            .iter()
            .zip(scores)
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Some(ranking))
    }

    /// Persist the fitted pipeline (preprocessing + estimator) as one unit.
    pub fn save(&self, path: &Path) -> Result<()> {
        let pipeline = self.pipeline.as_ref().ok_or(RetentionError::ModelNotFitted)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let saved = SavedModel {
            kind: self.kind,
            threshold: self.threshold,
            pipeline: pipeline.clone(),
        };
        let json = serde_json::to_string(&saved)?;
        fs::write(path, json)?;

        info!(path = %path.display(), model = self.kind.name(), "Model saved");
        Ok(())
    }

    /// Load a fitted pipeline, replacing any current fit. A failed load
    /// leaves the adapter unfitted.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.pipeline = None;

        let json = fs::read_to_string(path)
            .map_err(|e| RetentionError::ArtifactError(format!("cannot read {}: {}", path.display(), e)))?;
        let saved: SavedModel = serde_json::from_str(&json)?;

        self.kind = saved.kind;
        self.threshold = saved.threshold;
        self.pipeline = Some(saved.pipeline);

        info!(path = %path.display(), model = self.kind.name(), "Model loaded");
        Ok(())
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            model_type: self.kind.name().to_string(),
            is_fitted: self.is_fitted(),
            n_features: self.pipeline.as_ref().map(|p| p.n_features()),
            threshold: self.threshold,
        }
    }

    fn binarize(&self, proba: &Array1<f64>) -> Array1<f64> {
        proba.mapv(|p| if p >= self.threshold { 1.0 } else { 0.0 })
    }
}

/// Extract the numeric columns of a feature table, in table order, as an
/// f64 matrix with nulls mapped to NaN for the imputer.
pub fn numeric_matrix(df: &DataFrame) -> Result<(Vec<String>, Array2<f64>)> {
    let numeric: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .collect();

    if numeric.is_empty() {
        return Err(RetentionError::DataError(
            "feature table has no numeric columns".to_string(),
        ));
    }

    let names: Vec<String> = numeric.iter().map(|c| c.name().to_string()).collect();
    let mut data = Vec::with_capacity(df.height() * numeric.len());

    let columns: Vec<Vec<f64>> = numeric
        .iter()
        .map(|col| {
            let ca = col.as_materialized_series().cast(&DataType::Float64)?;
            let ca = ca.f64().map_err(|e| RetentionError::DataError(e.to_string()))?;
            Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        })
        .collect::<Result<Vec<_>>>()?;

    for row in 0..df.height() {
        for col in &columns {
            data.push(col[row]);
        }
    }

    let matrix = Array2::from_shape_vec((df.height(), names.len()), data)?;
    Ok((names, matrix))
}

/// Extract named columns in the given order.
fn select_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut data = Vec::with_capacity(df.height() * columns.len());
    let mut extracted = Vec::with_capacity(columns.len());

    for name in columns {
        let col = df
            .column(name)
            .map_err(|_| RetentionError::MissingColumn(name.clone()))?;
        let ca = col.as_materialized_series().cast(&DataType::Float64)?;
        let ca = ca.f64().map_err(|e| RetentionError::DataError(e.to_string()))?;
        let values: Vec<f64> = ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        extracted.push(values);
    }

    for row in 0..df.height() {
        for col in &extracted {
            data.push(col[row]);
        }
    }

    Ok(Array2::from_shape_vec((df.height(), columns.len()), data)?)
}

/// Target series as an f64 array of strict 0/1 values.
pub fn target_array(target: &Series) -> Result<Array1<f64>> {
    let ca = target.cast(&DataType::Float64)?;
    let ca = ca.f64().map_err(|e| RetentionError::DataError(e.to_string()))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}
