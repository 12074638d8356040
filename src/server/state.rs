//! Shared state for the serving API

use chrono::{DateTime, Utc};

use crate::artifacts::ArtifactStore;
use crate::error::Result;
use crate::features::FeatureInfo;
use crate::model::ModelAdapter;

/// Everything a handler needs: the loaded model, the frozen feature
/// metadata from training, and startup bookkeeping. Built once at startup
/// and shared read-only behind an `Arc`.
pub struct AppState {
    pub model_name: String,
    pub adapter: ModelAdapter,
    pub feature_info: FeatureInfo,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Load the named model and its feature metadata from the artifact
    /// store. Fails fast at startup rather than at first request.
    pub fn load(store: &ArtifactStore, model_name: &str) -> Result<Self> {
        let feature_info = store.load_feature_info()?;
        let mut adapter = ModelAdapter::new(model_name.parse()?);
        adapter.load(&store.model_path(model_name))?;

        Ok(Self {
            model_name: model_name.to_string(),
            adapter,
            feature_info,
            started_at: Utc::now(),
        })
    }
}
