//! On-disk artifact store for trained models, feature metadata, and reports.
//!
//! Everything is JSON under one base directory:
//!
//! ```text
//! artifacts/
//!   feature_info.json
//!   models/<name>.json
//!   reports/<name>.json
//!   comparison.json
//!   runs.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RetentionError, Result};
use crate::evaluation::{ComparisonRow, EvaluationReport};
use crate::features::FeatureInfo;

/// One completed training run, appended to `runs.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub models: Vec<String>,
    pub best_model: Option<String>,
    pub n_rows: usize,
    pub n_features: usize,
}

/// File-system artifact store rooted at a base directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.base_dir.join("models").join(format!("{}.json", name))
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.base_dir.join("plots")
    }

    fn feature_info_path(&self) -> PathBuf {
        self.base_dir.join("feature_info.json")
    }

    fn report_path(&self, name: &str) -> PathBuf {
        self.base_dir.join("reports").join(format!("{}.json", name))
    }

    fn comparison_path(&self) -> PathBuf {
        self.base_dir.join("comparison.json")
    }

    fn runs_path(&self) -> PathBuf {
        self.base_dir.join("runs.json")
    }

    pub fn save_feature_info(&self, info: &FeatureInfo) -> Result<()> {
        self.write_json(&self.feature_info_path(), info)
    }

    pub fn load_feature_info(&self) -> Result<FeatureInfo> {
        self.read_json(&self.feature_info_path())
    }

    pub fn save_report(&self, report: &EvaluationReport) -> Result<()> {
        self.write_json(&self.report_path(&report.model_name), report)
    }

    pub fn load_report(&self, name: &str) -> Result<EvaluationReport> {
        self.read_json(&self.report_path(name))
    }

    pub fn save_comparison(&self, rows: &[ComparisonRow]) -> Result<()> {
        self.write_json(&self.comparison_path(), &rows.to_vec())
    }

    pub fn load_comparison(&self) -> Result<Vec<ComparisonRow>> {
        self.read_json(&self.comparison_path())
    }

    /// Append a run record, keeping earlier runs intact.
    pub fn record_run(&self, record: RunRecord) -> Result<()> {
        let mut runs = self.load_runs()?;
        runs.push(record);
        self.write_json(&self.runs_path(), &runs)
    }

    pub fn load_runs(&self) -> Result<Vec<RunRecord>> {
        let path = self.runs_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        self.read_json(&path)
    }

    /// Model names with a saved artifact, sorted.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let dir = self.base_dir.join("models");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "Artifact written");
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RetentionError::ArtifactError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}
