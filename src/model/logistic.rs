//! Logistic regression for the binary withdrawal target

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

/// L2-regularized logistic regression fit by gradient descent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    /// L2 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit on a numeric matrix and a 0/1 target.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} target values", n_samples),
                actual: format!("{} target values", y.len()),
            });
        }

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * &dw;
            bias -= self.learning_rate * db;
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(RetentionError::ModelNotFitted)?;
        let linear = x.dot(coefficients) + self.intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// |coefficient| per feature, usable as an importance proxy.
    pub fn coefficient_magnitudes(&self) -> Option<Array1<f64>> {
        self.coefficients.as_ref().map(|c| c.mapv(f64::abs))
    }
}
