//! Train/test splitting and stratified cross-validation

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

/// A single train/test index split.
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified shuffled holdout split preserving class balance.
pub fn stratified_split(
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(RetentionError::ValidationError(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0.0, 1.0] {
        let mut indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, v)| (**v > 0.5) == (class > 0.5))
            .map(|(i, _)| i)
            .collect();
        indices.shuffle(&mut rng);

        let n_test = ((indices.len() as f64) * test_fraction).round() as usize;
        test.extend(indices.iter().take(n_test));
        train.extend(indices.iter().skip(n_test));
    }

    if train.is_empty() || test.is_empty() {
        return Err(RetentionError::ValidationError(
            "not enough samples for the requested split".to_string(),
        ));
    }

    Ok((train, test))
}

/// Stratified k-fold splitter.
///
/// Samples of each class are dealt round-robin across folds after a seeded
/// shuffle, so every fold keeps close to the global class balance.
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CvSplit>> {
        if self.n_splits < 2 {
            return Err(RetentionError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if y.len() < self.n_splits {
            return Err(RetentionError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                y.len(),
                self.n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];

        for class in [0.0, 1.0] {
            let mut indices: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|(_, v)| (**v > 0.5) == (class > 0.5))
                .map(|(i, _)| i)
                .collect();
            indices.shuffle(&mut rng);

            for (i, idx) in indices.into_iter().enumerate() {
                folds[i % self.n_splits].push(idx);
            }
        }

        let splits = (0..self.n_splits)
            .map(|fold_idx| {
                let test_indices = folds[fold_idx].clone();
                let train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                CvSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation summary over fold scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvMetrics {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub n_folds: usize,
}

impl CvMetrics {
    pub fn from_scores(fold_scores: Vec<f64>) -> Self {
        let n_folds = fold_scores.len();
        let mean_score = fold_scores.iter().sum::<f64>() / n_folds as f64;
        let variance = fold_scores
            .iter()
            .map(|s| (s - mean_score).powi(2))
            .sum::<f64>()
            / n_folds as f64;

        Self {
            fold_scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_target(n: usize) -> Array1<f64> {
        Array1::from_vec((0..n).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect())
    }

    #[test]
    fn test_stratified_split_preserves_balance() {
        let y = balanced_target(100);
        let (train, test) = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(train.len() + test.len(), 100);
        let test_pos = test.iter().filter(|&&i| y[i] > 0.5).count();
        assert_eq!(test_pos, 10);
    }

    #[test]
    fn test_stratified_split_invalid_fraction() {
        let y = balanced_target(10);
        assert!(stratified_split(&y, 0.0, 42).is_err());
        assert!(stratified_split(&y, 1.5, 42).is_err());
    }

    #[test]
    fn test_kfold_covers_all_indices_once() {
        let y = balanced_target(50);
        let splits = StratifiedKFold::new(5, 42).split(&y).unwrap();
        assert_eq!(splits.len(), 5);

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_kfold_rejects_single_split() {
        let y = balanced_target(10);
        assert!(StratifiedKFold::new(1, 42).split(&y).is_err());
    }

    #[test]
    fn test_cv_metrics_summary() {
        let metrics = CvMetrics::from_scores(vec![0.8, 0.9, 1.0]);
        assert!((metrics.mean_score - 0.9).abs() < 1e-12);
        assert_eq!(metrics.n_folds, 3);
    }
}
