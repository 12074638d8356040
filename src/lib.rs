//! retention-ml - Student attrition prediction pipeline
//!
//! A batch, offline pipeline that turns raw online-course tables
//! (demographics, registration, VLE clickstream rollups) into a model-ready
//! feature matrix, trains candidate binary classifiers, evaluates them with a
//! uniform metric contract, and serves predictions over a small REST API.
//!
//! # Modules
//!
//! ## Core
//! - [`features`] - Feature engineering: demographic, academic, behavioral stages
//! - [`model`] - Model adapter over an atomic fitted preprocessing+estimator pipeline
//! - [`evaluation`] - Metrics, evaluation reports, model comparison, diagnostic plots
//!
//! ## Collaborators
//! - [`data`] - Declared input schema and CSV loading
//! - [`pipeline`] - Batch orchestration of engineer -> train -> evaluate
//! - [`artifacts`] - Load/save-by-identifier artifact store
//! - [`server`] - HTTP serving boundary
//! - [`cli`] - Command-line interface

pub mod error;

pub mod artifacts;
pub mod cli;
pub mod data;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod server;

pub use error::{RetentionError, Result};
