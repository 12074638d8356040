//! Model evaluation: metrics, reports, comparison tables, and SVG plots.

mod metrics;
mod plots;
mod report;

pub use metrics::{
    average_precision, calculate_metrics, classification_report, confusion_matrix, f1_score,
    pr_curve, roc_auc, roc_curve, ClassReport, ClassificationMetrics,
};
pub use plots::{plot_confusion_matrix, plot_feature_importance, plot_pr_curve, plot_roc_curve};
pub use report::{compare_models, generate_evaluation_report, ComparisonRow, EvaluationReport};
