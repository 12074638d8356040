//! Binary classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{RetentionError, Result};

/// Threshold-based and threshold-free scores for a binary classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
    pub average_precision: f64,
}

/// Per-class row of a classification report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Compute the full metric set. Fails with `DegenerateTarget` when the
/// ground truth contains fewer than two classes, since ranking metrics are
/// undefined there.
pub fn calculate_metrics(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    y_proba: &Array1<f64>,
) -> Result<ClassificationMetrics> {
    check_two_classes(y_true)?;

    let (tp, fp, _, fn_) = confusion_counts(y_true, y_pred);
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        accuracy: correct as f64 / y_true.len() as f64,
        precision,
        recall,
        f1_score: f1,
        roc_auc: roc_auc(y_true, y_proba),
        average_precision: average_precision(y_true, y_proba),
    })
}

/// F1 alone, for cross-validation scoring. Returns 0.0 on degenerate folds
/// rather than failing, so a single bad fold does not abort the run.
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let (tp, fp, _, fn_) = confusion_counts(y_true, y_pred);
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// 2x2 confusion matrix as `[[tn, fp], [fn, tp]]` (rows are true class,
/// columns predicted class).
pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> [[usize; 2]; 2] {
    let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
    [[tn, fp], [fn_, tp]]
}

/// Per-class precision/recall/F1 with supports, both classes always listed.
pub fn classification_report(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    labels: (&str, &str),
) -> Vec<ClassReport> {
    let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);

    let class_row = |name: &str, tp: usize, fp: usize, fn_: usize, support: usize| {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassReport {
            class: name.to_string(),
            precision,
            recall,
            f1_score: f1,
            support,
        }
    };

    vec![
        // Negative class: its "true positives" are the true negatives
        class_row(labels.0, tn, fn_, fp, tn + fp),
        class_row(labels.1, tp, fp, fn_, tp + fn_),
    ]
}

/// Area under the ROC curve via the rank-sum formulation, with average
/// ranks for tied scores.
pub fn roc_auc(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[a]
            .partial_cmp(&y_proba[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_proba[order[j + 1]] == y_proba[order[i]] {
            j += 1;
        }
        // ranks are 1-based; ties share the average rank of their run
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        i = j + 1;
    }

    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let rank_sum: f64 = (0..n).filter(|&i| y_true[i] > 0.5).map(|i| ranks[i]).sum();
    (rank_sum - n_pos as f64 * (n_pos as f64 + 1.0) / 2.0) / (n_pos as f64 * n_neg as f64)
}

/// Average precision: the step-function area under the precision-recall
/// curve, scanning thresholds from the highest score down.
pub fn average_precision(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if n_pos == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[b]
            .partial_cmp(&y_proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut tp = 0usize;
    let mut ap = 0.0;
    let mut prev_recall = 0.0;

    for (seen, &idx) in order.iter().enumerate() {
        if y_true[idx] > 0.5 {
            tp += 1;
            let precision = tp as f64 / (seen + 1) as f64;
            let recall = tp as f64 / n_pos as f64;
            ap += (recall - prev_recall) * precision;
            prev_recall = recall;
        }
    }

    ap
}

/// ROC curve points as (fpr, tpr) pairs, for plotting.
pub fn roc_curve(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> Vec<(f64, f64)> {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return vec![(0.0, 0.0), (1.0, 1.0)];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[b]
            .partial_cmp(&y_proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 0.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    for &idx in &order {
        if y_true[idx] > 0.5 {
            tp += 1;
        } else {
            fp += 1;
        }
        points.push((fp as f64 / n_neg as f64, tp as f64 / n_pos as f64));
    }
    points
}

/// Precision-recall curve points as (recall, precision) pairs.
pub fn pr_curve(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> Vec<(f64, f64)> {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if n_pos == 0 {
        return vec![(0.0, 1.0), (1.0, 0.0)];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[b]
            .partial_cmp(&y_proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 1.0)];
    let mut tp = 0usize;
    for (seen, &idx) in order.iter().enumerate() {
        if y_true[idx] > 0.5 {
            tp += 1;
        }
        points.push((tp as f64 / n_pos as f64, tp as f64 / (seen + 1) as f64));
    }
    points
}

fn check_two_classes(y_true: &Array1<f64>) -> Result<()> {
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if y_true.is_empty() || n_pos == 0 || n_pos == y_true.len() {
        return Err(RetentionError::DegenerateTarget(format!(
            "need both classes present to evaluate, got {} positives out of {} rows",
            n_pos,
            y_true.len()
        )));
    }
    Ok(())
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom > 0 {
        num as f64 / denom as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_predictions() {
        let y_true = array![1.0, 0.0, 1.0, 0.0];
        let y_proba = array![0.9, 0.1, 0.8, 0.2];

        let m = calculate_metrics(&y_true, &y_true, &y_proba).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1_score, 1.0);
        assert_eq!(m.roc_auc, 1.0);
        assert!((m.average_precision - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_known_confusion_matrix() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        // tp=3, fn=1, fp=1, tn=3
        assert_eq!(confusion_matrix(&y_true, &y_pred), [[3, 1], [1, 3]]);

        let m = calculate_metrics(&y_true, &y_pred, &y_pred).unwrap();
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        assert!((m.f1_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_target_rejected() {
        let y_true = array![1.0, 1.0, 1.0];
        let y_pred = array![1.0, 0.0, 1.0];

        let err = calculate_metrics(&y_true, &y_pred, &y_pred).unwrap_err();
        assert!(matches!(err, RetentionError::DegenerateTarget(_)));
    }

    #[test]
    fn test_roc_auc_with_ties() {
        // All scores equal: AUC must be exactly 0.5
        let y_true = array![1.0, 0.0, 1.0, 0.0];
        let y_proba = array![0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y_true, &y_proba) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_reversed_ranking() {
        let y_true = array![1.0, 1.0, 0.0, 0.0];
        let y_proba = array![0.1, 0.2, 0.8, 0.9];
        assert!(roc_auc(&y_true, &y_proba).abs() < 1e-12);
    }

    #[test]
    fn test_classification_report_supports() {
        let y_true = array![1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 0.0, 0.0, 1.0];

        let report = classification_report(&y_true, &y_pred, ("retained", "withdrawn"));
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].class, "retained");
        assert_eq!(report[0].support, 3);
        assert_eq!(report[1].support, 2);
    }

    #[test]
    fn test_zero_division_yields_zero() {
        // No positive predictions at all
        let y_true = array![1.0, 0.0, 1.0, 0.0];
        let y_pred = array![0.0, 0.0, 0.0, 0.0];

        let m = calculate_metrics(&y_true, &y_pred, &y_pred).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }
}
