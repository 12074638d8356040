//! HTTP serving boundary.
//!
//! Exposes a trained model over a small REST API: health, model metadata,
//! and single-row prediction. The model and feature metadata are loaded
//! once at startup from the artifact store.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::error::{RetentionError, Result};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub model_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .unwrap_or_else(|_| "./artifacts".to_string())
                .into(),
            model_name: std::env::var("MODEL_NAME")
                .unwrap_or_else(|_| "logistic_regression".to_string()),
        }
    }
}

/// Start the server with the given configuration.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let store = ArtifactStore::new(config.artifact_dir.clone());
    let state = Arc::new(AppState::load(&store, &config.model_name)?);

    info!(
        model = %config.model_name,
        n_features = state.adapter.summary().n_features.unwrap_or(0),
        "Model loaded"
    );

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| RetentionError::ConfigError(format!("invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Server listening");
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping server gracefully");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
