//! NPV Predictor: well NPV regression from geology and completion design
//!
//! ## Architecture
//!
//! - **Pipeline**: preprocess, train, evaluate, register, report; each stage
//!   persists its outputs so stages can be re-run independently
//! - **Model**: gradient-boosted regression trees with k-fold cross-validation
//! - **Tracking**: MLflow-compatible experiment tracking and model registry
//! - **API**: HTTP prediction service backed by the persisted artifacts
//! - **Dashboard**: server-rendered UI in front of the prediction service

pub mod api;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod storage;
pub mod tracking;
pub mod types;

pub use config::PipelineConfig;
pub use inference::InferenceContext;
pub use model::{ModelArtifact, NpvRegressor, Scoring};
pub use pipeline::PipelineError;
pub use tracking::{ExperimentTracker, InMemoryTracking, MlflowClient, ModelRegistry, TrackingHandle};
pub use types::WellInput;
