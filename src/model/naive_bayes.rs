//! Gaussian naive bayes for the binary withdrawal target

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

/// Per-class Gaussian statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    means: Vec<f64>,
    variances: Vec<f64>,
    log_prior: f64,
}

/// Gaussian naive bayes specialized to the two-class case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    negative: Option<ClassStats>,
    positive: Option<ClassStats>,
    /// Variance floor to keep the likelihood finite on constant features.
    pub var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            negative: None,
            positive: None,
            var_smoothing: 1e-9,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} target values", n_samples),
                actual: format!("{} target values", y.len()),
            });
        }

        let pos_indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.5)
            .map(|(i, _)| i)
            .collect();
        let neg_indices: Vec<usize> = (0..n_samples).filter(|i| !pos_indices.contains(i)).collect();

        if pos_indices.is_empty() || neg_indices.is_empty() {
            return Err(RetentionError::TrainingError(
                "training target contains a single class".to_string(),
            ));
        }

        self.positive = Some(self.class_stats(x, &pos_indices, n_samples));
        self.negative = Some(self.class_stats(x, &neg_indices, n_samples));
        Ok(())
    }

    /// Welford single-pass mean and variance over one class's rows.
    fn class_stats(&self, x: &Array2<f64>, indices: &[usize], n_total: usize) -> ClassStats {
        let n_features = x.ncols();
        let mut means = vec![0.0; n_features];
        let mut m2 = vec![0.0; n_features];

        for (count, &idx) in indices.iter().enumerate() {
            let row = x.row(idx);
            for (j, &val) in row.iter().enumerate() {
                let delta = val - means[j];
                means[j] += delta / (count + 1) as f64;
                m2[j] += delta * (val - means[j]);
            }
        }

        let n = indices.len() as f64;
        let variances = m2
            .iter()
            .map(|&v| v / n + self.var_smoothing)
            .collect();

        ClassStats {
            means,
            variances,
            log_prior: (n / n_total as f64).ln(),
        }
    }

    fn log_joint(stats: &ClassStats, row: ArrayView1<f64>) -> f64 {
        let mut log_likelihood = 0.0;
        for ((&xi, &mean), &var) in row.iter().zip(&stats.means).zip(&stats.variances) {
            log_likelihood -=
                0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * std::f64::consts::PI).ln());
        }
        stats.log_prior + log_likelihood
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (neg, pos) = match (&self.negative, &self.positive) {
            (Some(n), Some(p)) => (n, p),
            _ => return Err(RetentionError::ModelNotFitted),
        };

        let proba = x
            .rows()
            .into_iter()
            .map(|row| {
                let log_neg = Self::log_joint(neg, row);
                let log_pos = Self::log_joint(pos, row);
                // p(pos) = 1 / (1 + exp(log_neg - log_pos))
                1.0 / (1.0 + (log_neg - log_pos).exp())
            })
            .collect();

        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_clusters() {
        let x = array![[0.0, 0.1], [0.1, 0.0], [0.2, 0.1], [5.0, 5.1], [5.1, 5.0], [4.9, 5.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = GaussianNaiveBayes::new();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[4] > 0.5);
    }

    #[test]
    fn test_single_class_fit_fails() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = GaussianNaiveBayes::new();
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = GaussianNaiveBayes::new();
        let x = array![[1.0]];
        assert!(matches!(
            model.predict_proba(&x),
            Err(RetentionError::ModelNotFitted)
        ));
    }
}
