//! CART decision tree over the binary withdrawal target
//!
//! Gini-split tree whose leaves store the positive-class fraction, so both
//! standalone trees and forest ensembles can emit class probabilities.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

/// Tree node: either an internal split or a leaf with the positive fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        positive_fraction: f64,
    },
}

/// Binary classification tree with gini impurity splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of candidate features per split; `None` uses all.
    pub max_features: Option<usize>,
    importances: Vec<f64>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            importances: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Fit on a numeric matrix and a 0/1 target. `feature_order` supplies a
    /// per-tree feature shuffle for ensembles (candidate subset = first
    /// `max_features` entries at every split).
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        feature_order: Option<&[usize]>,
    ) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(RetentionError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{} target values", y.len()),
            });
        }

        self.n_features = x.ncols();
        self.importances = vec![0.0; self.n_features];

        let default_order: Vec<usize> = (0..self.n_features).collect();
        let order = feature_order.unwrap_or(&default_order);
        let n_candidates = self.max_features.unwrap_or(self.n_features).max(1);
        let candidates: Vec<usize> = order.iter().copied().take(n_candidates).collect();

        let indices: Vec<usize> = (0..x.nrows()).collect();
        let root = self.build_node(x, y, &indices, &candidates, 0);
        self.root = Some(root);

        let total: f64 = self.importances.iter().sum();
        if total > 0.0 {
            for v in &mut self.importances {
                *v /= total;
            }
        }

        Ok(())
    }

    fn build_node(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        candidates: &[usize],
        depth: usize,
    ) -> TreeNode {
        let positives = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let fraction = positives as f64 / indices.len() as f64;

        let pure = positives == 0 || positives == indices.len();
        if pure || depth >= self.max_depth || indices.len() < self.min_samples_split {
            return TreeNode::Leaf {
                positive_fraction: fraction,
            };
        }

        let Some((feature, threshold, gain)) = self.best_split(x, y, indices, candidates) else {
            return TreeNode::Leaf {
                positive_fraction: fraction,
            };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            return TreeNode::Leaf {
                positive_fraction: fraction,
            };
        }

        self.importances[feature] += gain * indices.len() as f64;

        let left = self.build_node(x, y, &left_idx, candidates, depth + 1);
        let right = self.build_node(x, y, &right_idx, candidates, depth + 1);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Best (feature, threshold, impurity decrease) over the candidate set.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        candidates: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let parent_gini = gini(indices.iter().filter(|&&i| y[i] > 0.5).count(), indices.len());
        let n = indices.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in candidates {
            // Sort by feature value; midpoints between class changes are the
            // candidate thresholds
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                x[[a, feature]]
                    .partial_cmp(&x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let total_pos = sorted.iter().filter(|&&i| y[i] > 0.5).count();
            let mut left_pos = 0usize;

            for split_at in 1..sorted.len() {
                let prev = x[[sorted[split_at - 1], feature]];
                let curr = x[[sorted[split_at], feature]];
                if y[sorted[split_at - 1]] > 0.5 {
                    left_pos += 1;
                }
                if prev == curr {
                    continue;
                }

                let left_n = split_at;
                let right_n = sorted.len() - split_at;
                let weighted = (left_n as f64 / n) * gini(left_pos, left_n)
                    + (right_n as f64 / n) * gini(total_pos - left_pos, right_n);

                let gain = parent_gini - weighted;
                if gain > best.map_or(1e-12, |(_, _, g)| g) {
                    best = Some((feature, (prev + curr) / 2.0, gain));
                }
            }
        }

        best
    }

    /// Positive-class fraction at the matched leaf, per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(RetentionError::ModelNotFitted)?;

        let proba = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { positive_fraction } => return *positive_fraction,
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if row[*feature] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect();

        Ok(proba)
    }

    /// Normalized impurity-decrease importances.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        if self.root.is_some() {
            Some(&self.importances)
        } else {
            None
        }
    }
}

/// Gini impurity of a binary node.
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_simple_split() {
        let x = array![[0.0], [0.2], [0.4], [0.8], [0.9], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, None).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[5] > 0.5);
    }

    #[test]
    fn test_unfitted_fails() {
        let tree = DecisionTree::new();
        let x = array![[1.0]];
        assert!(matches!(
            tree.predict_proba(&x),
            Err(RetentionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let x = array![
            [0.0, 5.0],
            [0.1, 1.0],
            [0.2, 4.0],
            [0.9, 2.0],
            [1.0, 5.0],
            [1.1, 1.0]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, None).unwrap();

        let imp = tree.feature_importances().unwrap();
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_gini_bounds() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert!((gini(5, 10) - 0.5).abs() < 1e-12);
    }
}
