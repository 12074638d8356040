//! End-to-end training and scoring orchestration.
//!
//! The pipeline owns all file I/O: loading raw tables, persisting feature
//! metadata, models, reports, and the comparison table through an
//! [`ArtifactStore`]. Feature engineering and modelling stay pure.

use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::*;
use tracing::{info, warn};

use crate::artifacts::{ArtifactStore, RunRecord};
use crate::data::{load_interaction_aggregates, load_student_table, ID_STUDENT};
use crate::error::{RetentionError, Result};
use crate::evaluation::{compare_models, generate_evaluation_report, ComparisonRow};
use crate::features::{FeatureEngineer, FeatureInfo};
use crate::model::{EstimatorKind, ModelAdapter};

/// What to train and where to put it.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub student_data: PathBuf,
    pub interaction_data: Option<PathBuf>,
    pub artifact_dir: PathBuf,
    pub models: Vec<EstimatorKind>,
    pub seed: u64,
    pub cv_folds: Option<usize>,
    pub render_plots: bool,
}

impl PipelineConfig {
    pub fn new(student_data: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            student_data: student_data.into(),
            interaction_data: None,
            artifact_dir: artifact_dir.into(),
            models: vec![
                EstimatorKind::Logistic,
                EstimatorKind::NaiveBayes,
                EstimatorKind::RandomForest,
            ],
            seed: 42,
            cv_folds: None,
            render_plots: false,
        }
    }
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub comparison: Vec<ComparisonRow>,
    pub best_model: Option<String>,
    pub n_rows: usize,
    pub n_features: usize,
}

/// Trains every configured model on the same engineered features and writes
/// all artifacts for later scoring and serving.
pub struct TrainingPipeline {
    config: PipelineConfig,
    store: ArtifactStore,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let store = ArtifactStore::new(config.artifact_dir.clone());
        Self { config, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn run(&self) -> Result<PipelineOutcome> {
        let student_df = load_student_table(&self.config.student_data)?;
        let interactions = match &self.config.interaction_data {
            Some(path) => load_interaction_aggregates(path)?,
            None => None,
        };

        let mut engineer = FeatureEngineer::new();
        let (features, target) = engineer.prepare_features(&student_df, interactions.as_ref())?;
        let mut info = engineer
            .feature_info()
            .ok_or(RetentionError::FeatureError(
                "feature engineering recorded no metadata".to_string(),
            ))?
            .clone();

        // Identifier is carried through engineering for traceability but is
        // not a model input; the persisted metadata must list exactly the
        // columns the fitted model expects
        info.feature_columns.retain(|c| c != ID_STUDENT);
        info.numerical_columns.retain(|c| c != ID_STUDENT);
        self.store.save_feature_info(&info)?;

        let features = drop_identifier(features);
        let n_rows = features.height();
        let n_features = features.width();

        let mut reports = Vec::with_capacity(self.config.models.len());
        let mut trained = Vec::new();

        for &kind in &self.config.models {
            let mut adapter = ModelAdapter::new(kind).with_seed(self.config.seed);

            let train_report = match adapter.train(&features, &target) {
                Ok(r) => r,
                Err(e) => {
                    warn!(model = kind.name(), error = %e, "Model skipped");
                    continue;
                }
            };

            if let Some(folds) = self.config.cv_folds {
                let cv = adapter.cross_validate(&features, &target, folds)?;
                info!(
                    model = kind.name(),
                    f1_mean = format!("{:.3}", cv.mean_score),
                    "Cross-validation F1"
                );
            }

            let importances = adapter.feature_importance()?;
            let plot_dir = self.config.render_plots.then(|| self.store.plot_dir());
            let report = generate_evaluation_report(
                kind.name(),
                &train_report.holdout.y_true,
                &train_report.holdout.y_pred,
                &train_report.holdout.y_proba,
                importances.as_deref(),
                plot_dir.as_deref(),
            )?;

            self.store.save_report(&report)?;
            adapter.save(&self.store.model_path(kind.name()))?;

            trained.push(kind.name().to_string());
            reports.push(report);
        }

        if trained.is_empty() {
            return Err(RetentionError::TrainingError(
                "no model trained successfully".to_string(),
            ));
        }

        let comparison = compare_models(&reports);
        self.store.save_comparison(&comparison)?;

        let best_model = comparison.first().map(|r| r.model.clone());
        let run_id = format!("run-{}", Utc::now().format("%Y%m%d-%H%M%S"));
        self.store.record_run(RunRecord {
            run_id: run_id.clone(),
            timestamp: Utc::now(),
            models: trained,
            best_model: best_model.clone(),
            n_rows,
            n_features,
        })?;

        info!(
            run_id,
            best = best_model.as_deref().unwrap_or("-"),
            "Pipeline run complete"
        );

        Ok(PipelineOutcome {
            run_id,
            comparison,
            best_model,
            n_rows,
            n_features,
        })
    }
}

/// Per-student withdrawal scores from a saved model.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub student_ids: Vec<Option<i64>>,
    pub probabilities: Vec<f64>,
    pub labels: Vec<i32>,
}

/// Score a raw student table with a previously trained model, reusing the
/// frozen feature metadata from training.
pub fn score_batch(
    store: &ArtifactStore,
    model_name: &str,
    student_data: &Path,
    interaction_data: Option<&Path>,
) -> Result<ScoredBatch> {
    let info: FeatureInfo = store.load_feature_info()?;
    let mut adapter = ModelAdapter::new(model_name.parse()?);
    adapter.load(&store.model_path(model_name))?;

    let student_df = load_student_table(student_data)?;
    let interactions = match interaction_data {
        Some(path) => load_interaction_aggregates(path)?,
        None => None,
    };

    let engineer = FeatureEngineer::new();
    let features = engineer.transform_with_info(&student_df, interactions.as_ref(), &info)?;

    let student_ids = match features.column(ID_STUDENT) {
        Ok(col) => col
            .cast(&DataType::Int64)?
            .i64()
            .map_err(|e| RetentionError::DataError(e.to_string()))?
            .into_iter()
            .collect(),
        Err(_) => vec![None; features.height()],
    };

    let probabilities = adapter.predict_proba(&features)?;
    let labels = probabilities
        .iter()
        .map(|&p| if p >= 0.5 { 1 } else { 0 })
        .collect();

    info!(
        model = model_name,
        rows = features.height(),
        "Batch scored"
    );

    Ok(ScoredBatch {
        student_ids,
        probabilities: probabilities.to_vec(),
        labels,
    })
}

fn drop_identifier(features: DataFrame) -> DataFrame {
    match features.drop(ID_STUDENT) {
        Ok(dropped) => dropped,
        Err(_) => features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_student_csv(path: &Path, rows: usize) {
        let mut csv = String::from(
            "id_student,code_module,code_presentation,final_result,gender,imd_band,num_of_prev_attempts,studied_credits,date_registration\n",
        );
        for i in 0..rows {
            let outcome = if i % 3 == 0 { "Withdrawn" } else { "Pass" };
            let gender = if i % 2 == 0 { "M" } else { "F" };
            let imd = if i % 4 == 0 { "0-10%" } else { "90-100%" };
            let credits = 60 + (i % 4) * 30;
            csv.push_str(&format!(
                "{},AAA,2013J,{},{},{},{},{},-{}\n",
                1000 + i,
                outcome,
                gender,
                imd,
                i % 2,
                credits,
                (i % 10) * 3
            ));
        }
        fs::write(path, csv).unwrap();
    }

    #[test]
    fn test_full_run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("students.csv");
        write_student_csv(&data, 90);

        let mut config = PipelineConfig::new(&data, dir.path().join("artifacts"));
        config.models = vec![EstimatorKind::Logistic, EstimatorKind::NaiveBayes];

        let pipeline = TrainingPipeline::new(config);
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.comparison.len(), 2);
        assert!(outcome.best_model.is_some());
        assert!(pipeline.store().load_feature_info().is_ok());
        assert_eq!(
            pipeline.store().list_models().unwrap(),
            vec!["logistic_regression", "naive_bayes"]
        );
        assert_eq!(pipeline.store().load_runs().unwrap().len(), 1);
    }

    #[test]
    fn test_feature_info_matches_model_contract() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("students.csv");
        write_student_csv(&data, 90);

        let mut config = PipelineConfig::new(&data, dir.path().join("artifacts"));
        config.models = vec![EstimatorKind::Logistic];
        let pipeline = TrainingPipeline::new(config);
        pipeline.run().unwrap();

        let info = pipeline.store().load_feature_info().unwrap();
        assert!(!info.numerical_columns.contains(&ID_STUDENT.to_string()));
        assert!(!info.feature_columns.contains(&ID_STUDENT.to_string()));

        // A client building a flat vector from the persisted metadata must
        // match the model's expected width exactly
        let mut adapter = ModelAdapter::new(EstimatorKind::Logistic);
        adapter
            .load(&pipeline.store().model_path("logistic_regression"))
            .unwrap();
        assert_eq!(info.numerical_columns, adapter.feature_names().unwrap());

        let request_row = vec![0.0; info.numerical_columns.len()];
        assert!(adapter.predict_one(&request_row).is_ok());
    }

    #[test]
    fn test_score_batch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("students.csv");
        write_student_csv(&data, 90);

        let mut config = PipelineConfig::new(&data, dir.path().join("artifacts"));
        config.models = vec![EstimatorKind::Logistic];
        let pipeline = TrainingPipeline::new(config);
        pipeline.run().unwrap();

        let scored =
            score_batch(pipeline.store(), "logistic_regression", &data, None).unwrap();
        assert_eq!(scored.probabilities.len(), 90);
        assert_eq!(scored.student_ids[0], Some(1000));
        assert!(scored
            .probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
        assert!(scored.labels.iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn test_single_class_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("students.csv");
        let mut csv = String::from(
            "id_student,code_module,code_presentation,final_result,studied_credits\n",
        );
        for i in 0..30 {
            csv.push_str(&format!("{},AAA,2013J,Pass,{}\n", i, 60 + i));
        }
        fs::write(&data, csv).unwrap();

        let mut config = PipelineConfig::new(&data, dir.path().join("artifacts"));
        config.models = vec![EstimatorKind::Logistic];
        let pipeline = TrainingPipeline::new(config);

        assert!(pipeline.run().is_err());
    }
}
