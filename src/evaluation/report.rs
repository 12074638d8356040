//! Evaluation reports and cross-model comparison

use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::model::FeatureImportance;

use super::metrics::{
    calculate_metrics, classification_report, confusion_matrix, pr_curve, roc_curve,
    ClassReport, ClassificationMetrics,
};
use super::plots;

/// Class display names used in reports and plots.
const CLASS_LABELS: (&str, &str) = ("retained", "withdrawn");

/// Everything produced by evaluating one model on a holdout set.
///
/// `metrics` is optional: a report can be constructed for a model whose
/// metric computation failed, and such reports are excluded from comparison
/// rather than aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_name: String,
    pub metrics: Option<ClassificationMetrics>,
    pub classification_report: Vec<ClassReport>,
    pub confusion_matrix: [[usize; 2]; 2],
    pub plots: Vec<PathBuf>,
}

/// One row of the comparison table. The model column keeps the name the
/// downstream reporting tooling expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    #[serde(rename = "Modelo")]
    pub model: String,
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "F1-Score")]
    pub f1_score: f64,
    #[serde(rename = "ROC-AUC")]
    pub roc_auc: f64,
    #[serde(rename = "Average Precision")]
    pub average_precision: f64,
}

/// Evaluate one model's holdout predictions.
///
/// When `plot_dir` is given, diagnostic SVGs are written there; a plot that
/// fails to render is logged and skipped, never fatal.
pub fn generate_evaluation_report(
    model_name: &str,
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    y_proba: &Array1<f64>,
    importances: Option<&[FeatureImportance]>,
    plot_dir: Option<&Path>,
) -> Result<EvaluationReport> {
    let metrics = calculate_metrics(y_true, y_pred, y_proba)?;
    let matrix = confusion_matrix(y_true, y_pred);
    let class_report = classification_report(y_true, y_pred, CLASS_LABELS);

    let mut plot_paths = Vec::new();
    if let Some(dir) = plot_dir {
        std::fs::create_dir_all(dir)?;

        let cm_path = dir.join(format!("{}_confusion_matrix.svg", model_name));
        match plots::plot_confusion_matrix(&matrix, CLASS_LABELS, &cm_path) {
            Ok(()) => plot_paths.push(cm_path),
            Err(e) => warn!(model = model_name, error = %e, "Skipping confusion matrix plot"),
        }

        let roc_path = dir.join(format!("{}_roc_curve.svg", model_name));
        match plots::plot_roc_curve(&roc_curve(y_true, y_proba), metrics.roc_auc, &roc_path) {
            Ok(()) => plot_paths.push(roc_path),
            Err(e) => warn!(model = model_name, error = %e, "Skipping ROC plot"),
        }

        let pr_path = dir.join(format!("{}_pr_curve.svg", model_name));
        match plots::plot_pr_curve(
            &pr_curve(y_true, y_proba),
            metrics.average_precision,
            &pr_path,
        ) {
            Ok(()) => plot_paths.push(pr_path),
            Err(e) => warn!(model = model_name, error = %e, "Skipping PR plot"),
        }

        if let Some(ranking) = importances {
            let imp_path = dir.join(format!("{}_feature_importance.svg", model_name));
            match plots::plot_feature_importance(ranking, 15, &imp_path) {
                Ok(()) => plot_paths.push(imp_path),
                Err(e) => warn!(model = model_name, error = %e, "Skipping importance plot"),
            }
        }
    }

    Ok(EvaluationReport {
        model_name: model_name.to_string(),
        metrics: Some(metrics),
        classification_report: class_report,
        confusion_matrix: matrix,
        plots: plot_paths,
    })
}

/// Build a comparison table from a set of reports, best F1 first.
///
/// Reports without a metrics block are silently dropped. The sort is stable,
/// so models with identical F1 keep their input order.
pub fn compare_models(reports: &[EvaluationReport]) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = reports
        .iter()
        .filter_map(|r| {
            r.metrics.as_ref().map(|m| ComparisonRow {
                model: r.model_name.clone(),
                accuracy: m.accuracy,
                precision: m.precision,
                recall: m.recall,
                f1_score: m.f1_score,
                roc_auc: m.roc_auc,
                average_precision: m.average_precision,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.f1_score
            .partial_cmp(&a.f1_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
