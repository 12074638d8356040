//! Diagnostic SVG charts for evaluation reports

use std::path::Path;

use plotters::prelude::*;
use plotters_svg::SVGBackend;

use crate::error::{RetentionError, Result};
use crate::model::FeatureImportance;

const CHART_SIZE: (u32, u32) = (640, 480);

fn draw_err(context: &str, e: impl std::fmt::Display) -> RetentionError {
    RetentionError::EvaluationError(format!("{}: {}", context, e))
}

/// Render a 2x2 confusion matrix as a shaded grid with counts.
pub fn plot_confusion_matrix(
    matrix: &[[usize; 2]; 2],
    labels: (&str, &str),
    path: &Path,
) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err("confusion plot", e))?;

    let max_count = matrix.iter().flatten().copied().max().unwrap_or(1).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Confusion matrix", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0i32..2, 0i32..2)
        .map_err(|e| draw_err("confusion plot", e))?;

    let names = [labels.0.to_string(), labels.1.to_string()];
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Predicted")
        .y_desc("Actual")
        .x_labels(2)
        .y_labels(2)
        .x_label_formatter(&|v| names.get(*v as usize).cloned().unwrap_or_default())
        .y_label_formatter(&|v| names.get(*v as usize).cloned().unwrap_or_default())
        .draw()
        .map_err(|e| draw_err("confusion plot", e))?;

    for (row, cells) in matrix.iter().enumerate() {
        for (col, &count) in cells.iter().enumerate() {
            let intensity = count as f64 / max_count as f64;
            let shade = RGBColor(
                (255.0 - 180.0 * intensity) as u8,
                (255.0 - 120.0 * intensity) as u8,
                255,
            );
            let (x, y) = (col as i32, row as i32);
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x, y), (x + 1, y + 1)],
                    shade.filled(),
                )))
                .map_err(|e| draw_err("confusion plot", e))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    count.to_string(),
                    (x, y),
                    ("sans-serif", 28).into_font().color(&BLACK),
                )))
                .map_err(|e| draw_err("confusion plot", e))?;
        }
    }

    root.present().map_err(|e| draw_err("confusion plot", e))?;
    Ok(())
}

/// Render the ROC curve with the chance diagonal and AUC in the caption.
pub fn plot_roc_curve(points: &[(f64, f64)], auc: f64, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err("ROC plot", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("ROC curve (AUC = {:.3})", auc),
            ("sans-serif", 24).into_font(),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1.0, 0f64..1.0)
        .map_err(|e| draw_err("ROC plot", e))?;

    chart
        .configure_mesh()
        .x_desc("False positive rate")
        .y_desc("True positive rate")
        .draw()
        .map_err(|e| draw_err("ROC plot", e))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(|e| draw_err("ROC plot", e))?;
    chart
        .draw_series(LineSeries::new(
            vec![(0.0, 0.0), (1.0, 1.0)],
            RED.stroke_width(1),
        ))
        .map_err(|e| draw_err("ROC plot", e))?;

    root.present().map_err(|e| draw_err("ROC plot", e))?;
    Ok(())
}

/// Render the precision-recall curve.
pub fn plot_pr_curve(points: &[(f64, f64)], average_precision: f64, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err("PR plot", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Precision-recall curve (AP = {:.3})", average_precision),
            ("sans-serif", 24).into_font(),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1.0, 0f64..1.0)
        .map_err(|e| draw_err("PR plot", e))?;

    chart
        .configure_mesh()
        .x_desc("Recall")
        .y_desc("Precision")
        .draw()
        .map_err(|e| draw_err("PR plot", e))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(|e| draw_err("PR plot", e))?;

    root.present().map_err(|e| draw_err("PR plot", e))?;
    Ok(())
}

/// Horizontal bar chart of the top feature importances.
pub fn plot_feature_importance(
    ranking: &[FeatureImportance],
    top_n: usize,
    path: &Path,
) -> Result<()> {
    let top: Vec<&FeatureImportance> = ranking.iter().take(top_n).collect();
    if top.is_empty() {
        return Err(RetentionError::EvaluationError(
            "no importances to plot".to_string(),
        ));
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err("importance plot", e))?;

    let max_imp = top
        .iter()
        .map(|f| f.importance)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1e-9);
    let n = top.len() as i32;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature importance", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(180)
        .build_cartesian_2d(0f64..max_imp * 1.1, 0i32..n)
        .map_err(|e| draw_err("importance plot", e))?;

    let names: Vec<String> = top.iter().map(|f| f.feature.clone()).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Importance")
        .y_labels(top.len())
        .y_label_formatter(&|v| names.get(*v as usize).cloned().unwrap_or_default())
        .draw()
        .map_err(|e| draw_err("importance plot", e))?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, f)| {
            let y = n - 1 - i as i32;
            Rectangle::new([(0.0, y), (f.importance, y + 1)], BLUE.filled())
        }))
        .map_err(|e| draw_err("importance plot", e))?;

    root.present().map_err(|e| draw_err("importance plot", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_plots_render_svg() {
        let dir = tempfile::tempdir().unwrap();

        let cm_path = dir.path().join("cm.svg");
        plot_confusion_matrix(&[[30, 5], [8, 22]], ("retained", "withdrawn"), &cm_path).unwrap();
        assert!(cm_path.exists());

        let y_true = array![1.0, 0.0, 1.0, 0.0, 1.0];
        let y_proba = array![0.9, 0.2, 0.7, 0.4, 0.6];
        let roc = crate::evaluation::roc_curve(&y_true, &y_proba);
        let roc_path = dir.path().join("roc.svg");
        plot_roc_curve(&roc, 0.9, &roc_path).unwrap();
        assert!(roc_path.exists());

        let pr = crate::evaluation::pr_curve(&y_true, &y_proba);
        let pr_path = dir.path().join("pr.svg");
        plot_pr_curve(&pr, 0.8, &pr_path).unwrap();
        assert!(pr_path.exists());
    }

    #[test]
    fn test_importance_plot() {
        let dir = tempfile::tempdir().unwrap();
        let ranking = vec![
            FeatureImportance {
                feature: "total_clicks".to_string(),
                importance: 0.6,
            },
            FeatureImportance {
                feature: "studied_credits".to_string(),
                importance: 0.4,
            },
        ];
        let path = dir.path().join("imp.svg");
        plot_feature_importance(&ranking, 10, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_importance_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imp.svg");
        assert!(plot_feature_importance(&[], 10, &path).is_err());
    }
}
