//! Fitted preprocessing + estimator pipeline
//!
//! The imputer statistics, scaler parameters and the estimator are fit
//! together and only ever persisted or loaded as one value. Splitting them
//! apart is how training-time and inference-time preprocessing drift out of
//! sync, so the type does not offer partial access.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

use super::estimator::{Estimator, EstimatorKind};

/// Per-column standardization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    mean: f64,
    std: f64,
}

/// One atomic unit of fitted state: median imputer, standard scaler, and the
/// estimator they were fit alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Numeric feature names, in training order.
    feature_names: Vec<String>,
    /// Training-time median per column, used to fill missing values.
    medians: Vec<f64>,
    scaler: Vec<ScalerParams>,
    estimator: Estimator,
}

impl FittedPipeline {
    /// Fit the imputer, the scaler, and the estimator on the same matrix, in
    /// that order. `x` may contain NaN for missing values.
    pub fn fit(
        kind: EstimatorKind,
        seed: u64,
        feature_names: Vec<String>,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<Self> {
        if feature_names.len() != x.ncols() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} feature names", x.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let medians = column_medians(x);
        let imputed = impute(x, &medians);

        let scaler = fit_scaler(&imputed);
        let scaled = apply_scaler(&imputed, &scaler);

        let mut estimator = Estimator::new(kind, seed);
        estimator.fit(&scaled, y)?;

        Ok(Self {
            feature_names,
            medians,
            scaler,
            estimator,
        })
    }

    /// Apply the frozen imputer and scaler to a raw numeric matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.feature_names.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let imputed = impute(x, &self.medians);
        Ok(apply_scaler(&imputed, &self.scaler))
    }

    /// Positive-class probability after preprocessing.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.transform(x)?;
        self.estimator.predict_proba(&scaled)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn estimator_kind(&self) -> EstimatorKind {
        self.estimator.kind()
    }

    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        self.estimator.feature_importances()
    }
}

/// Median per column, ignoring NaN; all-NaN columns fall back to 0.
fn column_medians(x: &Array2<f64>) -> Vec<f64> {
    (0..x.ncols())
        .map(|j| {
            let mut values: Vec<f64> = x.column(j).iter().copied().filter(|v| v.is_finite()).collect();
            if values.is_empty() {
                return 0.0;
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            }
        })
        .collect()
}

fn impute(x: &Array2<f64>, medians: &[f64]) -> Array2<f64> {
    let mut out = x.clone();
    for (j, &median) in medians.iter().enumerate() {
        for v in out.column_mut(j) {
            if !v.is_finite() {
                *v = median;
            }
        }
    }
    out
}

fn fit_scaler(x: &Array2<f64>) -> Vec<ScalerParams> {
    (0..x.ncols())
        .map(|j| {
            let col = x.column(j);
            let n = col.len() as f64;
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            ScalerParams {
                mean,
                std: if std == 0.0 { 1.0 } else { std },
            }
        })
        .collect()
}

fn apply_scaler(x: &Array2<f64>, params: &[ScalerParams]) -> Array2<f64> {
    let mut out = x.clone();
    for (j, p) in params.iter().enumerate() {
        for v in out.column_mut(j) {
            *v = (*v - p.mean) / p.std;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_fit_imputes_and_scales() {
        let x = array![[1.0, f64::NAN], [2.0, 4.0], [3.0, 6.0], [10.0, 8.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let pipeline =
            FittedPipeline::fit(EstimatorKind::Logistic, 42, names(2), &x, &y).unwrap();
        let transformed = pipeline.transform(&x).unwrap();

        // No NaN survives the imputer
        assert!(transformed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [1.0, 4.0], [3.0, 2.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let pipeline =
            FittedPipeline::fit(EstimatorKind::Logistic, 42, names(2), &x, &y).unwrap();

        let narrow = array![[1.0], [2.0]];
        assert!(matches!(
            pipeline.transform(&narrow),
            Err(RetentionError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_round_trip_serialization_is_atomic() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [1.0, 4.0], [3.0, 2.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let pipeline =
            FittedPipeline::fit(EstimatorKind::NaiveBayes, 42, names(2), &x, &y).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: FittedPipeline = serde_json::from_str(&json).unwrap();

        let a = pipeline.predict_proba(&x).unwrap();
        let b = restored.predict_proba(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_median_imputation_value() {
        let x = array![[1.0], [2.0], [f64::NAN], [100.0]];
        let medians = column_medians(&x);
        assert_eq!(medians, vec![2.0]);
    }
}
