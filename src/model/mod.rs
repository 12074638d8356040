//! Model training, prediction, and persistence.
//!
//! The public surface is [`ModelAdapter`], which wraps any
//! [`EstimatorKind`] behind a single fit/predict/save contract. Preprocessing
//! (median imputation, standardization) lives inside [`FittedPipeline`] and
//! is always persisted together with the estimator it was fitted for.

mod adapter;
mod cross_validation;
mod estimator;
mod forest;
mod logistic;
mod naive_bayes;
mod pipeline;
mod tree;

pub use adapter::{
    numeric_matrix, target_array, FeatureImportance, HoldoutPredictions, ModelAdapter,
    ModelSummary, TrainReport,
};
pub use cross_validation::{stratified_split, CvMetrics, CvSplit, StratifiedKFold};
pub use estimator::{Estimator, EstimatorKind};
pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use pipeline::FittedPipeline;
pub use tree::DecisionTree;
