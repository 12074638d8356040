//! Pluggable estimator dispatch

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

use super::forest::RandomForest;
use super::logistic::LogisticRegression;
use super::naive_bayes::GaussianNaiveBayes;

/// Which learning algorithm a model adapter wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorKind {
    Logistic,
    NaiveBayes,
    RandomForest,
}

impl EstimatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorKind::Logistic => "logistic_regression",
            EstimatorKind::NaiveBayes => "naive_bayes",
            EstimatorKind::RandomForest => "random_forest",
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = RetentionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic" | "logistic_regression" => Ok(EstimatorKind::Logistic),
            "naive_bayes" | "nb" => Ok(EstimatorKind::NaiveBayes),
            "random_forest" | "rf" => Ok(EstimatorKind::RandomForest),
            other => Err(RetentionError::ConfigError(format!(
                "unknown model type '{}', expected logistic, naive_bayes, or random_forest",
                other
            ))),
        }
    }
}

/// A concrete binary classifier behind a uniform fit/predict_proba surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    Logistic(LogisticRegression),
    NaiveBayes(GaussianNaiveBayes),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Fresh unfitted estimator of the given kind with a fixed seed where the
    /// algorithm is stochastic.
    pub fn new(kind: EstimatorKind, seed: u64) -> Self {
        match kind {
            EstimatorKind::Logistic => Estimator::Logistic(LogisticRegression::new()),
            EstimatorKind::NaiveBayes => Estimator::NaiveBayes(GaussianNaiveBayes::new()),
            EstimatorKind::RandomForest => {
                Estimator::RandomForest(RandomForest::new(100).with_seed(seed))
            }
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Logistic(_) => EstimatorKind::Logistic,
            Estimator::NaiveBayes(_) => EstimatorKind::NaiveBayes,
            Estimator::RandomForest(_) => EstimatorKind::RandomForest,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::Logistic(m) => m.fit(x, y),
            Estimator::NaiveBayes(m) => m.fit(x, y),
            Estimator::RandomForest(m) => m.fit(x, y),
        }
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::Logistic(m) => m.predict_proba(x),
            Estimator::NaiveBayes(m) => m.predict_proba(x),
            Estimator::RandomForest(m) => m.predict_proba(x),
        }
    }

    /// Per-feature importance scores; `None` for algorithms without a native
    /// notion of importance. Absence is tolerated, never fatal.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Estimator::Logistic(m) => m.coefficient_magnitudes().map(|a| a.to_vec()),
            Estimator::NaiveBayes(_) => None,
            Estimator::RandomForest(m) => m.feature_importances().map(|s| s.to_vec()),
        }
    }
}
