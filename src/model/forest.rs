//! Random forest over binary CART trees

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

use super::tree::DecisionTree;

/// Bagged ensemble of gini trees with sqrt-feature subsampling.
///
/// Probabilities are the mean of per-tree leaf fractions rather than hard
/// vote counts, which gives the evaluator a smoother ranking signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
    importances: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: 12,
            min_samples_split: 2,
            seed: 42,
            importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} target values", n_samples),
                actual: format!("{} target values", y.len()),
            });
        }

        let max_features = (n_features as f64).sqrt().ceil() as usize;

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));

                // Bootstrap sample
                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();
                let x_boot = x.select(ndarray::Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut feature_order: Vec<usize> = (0..n_features).collect();
                feature_order.shuffle(&mut rng);

                let mut tree = DecisionTree::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split);
                tree.max_features = Some(max_features);

                tree.fit(&x_boot, &y_boot, Some(&feature_order)).map(|_| tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.importances = vec![0.0; n_features];
        for tree in &trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, v) in self.importances.iter_mut().zip(imp) {
                    *total += v;
                }
            }
        }
        let sum: f64 = self.importances.iter().sum();
        if sum > 0.0 {
            for v in &mut self.importances {
                *v /= sum;
            }
        }

        self.trees = trees;
        Ok(())
    }

    /// Positive-class probability per row, averaged over the ensemble.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RetentionError::ModelNotFitted);
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let n = per_tree.len() as f64;
        let mut mean = Array1::zeros(x.nrows());
        for proba in &per_tree {
            mean = mean + proba;
        }
        Ok(mean / n)
    }

    /// Normalized mean impurity-decrease importances.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        if self.trees.is_empty() {
            None
        } else {
            Some(&self.importances)
        }
    }
}
