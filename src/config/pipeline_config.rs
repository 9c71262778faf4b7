//! Pipeline Configuration - data paths, feature columns, model and service settings
//!
//! Every stage of the training pipeline, the prediction service and the
//! dashboard read the same `params.toml`. Each section implements `Default`
//! so a partial (or absent) file still yields a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration shared by every pipeline stage and both servers.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. An explicit path (CLI `--config`)
/// 2. `$NPV_CONFIG` env var
/// 3. `./params.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw and processed data locations
    #[serde(default)]
    pub data: DataConfig,

    /// Persisted artifact and document locations
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Target, dropped and categorical columns
    #[serde(default)]
    pub features: FeatureConfig,

    /// Train/test split
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Estimator name and hyperparameters
    #[serde(default)]
    pub model: ModelConfig,

    /// Cross-validation settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Experiment tracking server
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Model registry naming
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Prediction service
    #[serde(default)]
    pub server: ServerConfig,

    /// Dashboard UI
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicitly requested file must load; a broken `$NPV_CONFIG` or
    /// `./params.toml` is logged and skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from --config");
            return Ok(config);
        }

        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./params.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys only warn; invalid values fail.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate settings for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = super::validation::validate_ranges(self);

        let f = &self.features;
        if f.target.trim().is_empty() {
            errors.push("features.target must not be empty".to_string());
        }
        if f.drop_columns.contains(&f.target) {
            errors.push(format!(
                "features.target '{}' must not also be listed in drop_columns",
                f.target
            ));
        }
        if f.categorical_columns.contains(&f.target) {
            errors.push(format!(
                "features.target '{}' must not also be listed in categorical_columns",
                f.target
            ));
        }
        for c in &f.categorical_columns {
            if f.drop_columns.contains(c) {
                errors.push(format!(
                    "column '{c}' is listed both as categorical and as dropped"
                ));
            }
        }

        if self.tracking.experiment_name.trim().is_empty() {
            errors.push("tracking.experiment_name must not be empty".to_string());
        }
        if self.model.name.trim().is_empty() {
            errors.push("model.name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Registered model name, e.g. `gbdt_NPV`.
    pub fn registered_model_name(&self) -> String {
        self.registry
            .model_name_template
            .replace("{name}", &self.model.name)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Data
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw well table (workbook or CSV), one row per well
    #[serde(default = "default_raw_path")]
    pub raw_path: PathBuf,
    /// Processed train/test split written by the preprocess stage
    #[serde(default = "default_processed_path")]
    pub processed_path: PathBuf,
}

fn default_raw_path() -> PathBuf {
    PathBuf::from(defaults::RAW_DATA_PATH)
}

fn default_processed_path() -> PathBuf {
    PathBuf::from(defaults::PROCESSED_SPLIT_PATH)
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: default_raw_path(),
            processed_path: default_processed_path(),
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
    pub feature_columns_path: PathBuf,
    pub metrics_path: PathBuf,
    pub evaluation_path: PathBuf,
    pub report_path: PathBuf,
    pub registry_status_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::MODEL_PATH),
            encoder_path: PathBuf::from(defaults::ENCODER_PATH),
            feature_columns_path: PathBuf::from(defaults::FEATURE_COLUMNS_PATH),
            metrics_path: PathBuf::from(defaults::METRICS_PATH),
            evaluation_path: PathBuf::from(defaults::EVALUATION_PATH),
            report_path: PathBuf::from(defaults::REPORT_PATH),
            registry_status_path: PathBuf::from(defaults::REGISTRY_STATUS_PATH),
        }
    }
}

// ============================================================================
// Features
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Regression target column
    pub target: String,
    /// Columns removed before encoding (not available at prediction time)
    pub drop_columns: Vec<String>,
    /// Columns one-hot encoded with the first category dropped
    pub categorical_columns: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target: defaults::TARGET_COLUMN.to_string(),
            drop_columns: defaults::DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            categorical_columns: defaults::CATEGORICAL_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ============================================================================
// Preprocessing
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub random_state: u64,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            test_size: defaults::TEST_SIZE,
            random_state: defaults::RANDOM_STATE,
        }
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Short estimator name used in reports and the registry
    pub name: String,
    pub hyperparameters: Hyperparameters,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: defaults::MODEL_NAME.to_string(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    pub max_depth: u32,
    /// Shrinkage applied to each tree
    pub learning_rate: f64,
    /// Row sampling ratio per tree, in (0, 1]
    pub subsample: f64,
    /// Feature sampling ratio per tree, in (0, 1]
    pub colsample: f64,
    pub min_leaf_size: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: defaults::N_ESTIMATORS,
            max_depth: defaults::MAX_DEPTH,
            learning_rate: defaults::LEARNING_RATE,
            subsample: defaults::SUBSAMPLE,
            colsample: defaults::COLSAMPLE,
            min_leaf_size: defaults::MIN_LEAF_SIZE,
        }
    }
}

impl Hyperparameters {
    /// Flatten into `(key, value)` pairs for the experiment tracker.
    pub fn as_params(&self) -> Vec<(String, String)> {
        vec![
            ("n_estimators".to_string(), self.n_estimators.to_string()),
            ("max_depth".to_string(), self.max_depth.to_string()),
            ("learning_rate".to_string(), self.learning_rate.to_string()),
            ("subsample".to_string(), self.subsample.to_string()),
            ("colsample".to_string(), self.colsample.to_string()),
            ("min_leaf_size".to_string(), self.min_leaf_size.to_string()),
        ]
    }
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub cv_folds: usize,
    pub scoring: crate::model::Scoring,
    /// Grid searched before the final fit; absent means train with
    /// `[model.hyperparameters]` as given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cv_folds: defaults::CV_FOLDS,
            scoring: crate::model::Scoring::R2,
            search: None,
        }
    }
}

/// Hyperparameter grid. Each non-empty list replaces the matching value in
/// `[model.hyperparameters]`; the remaining values are shared by every
/// candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<u32>,
    pub learning_rate: Vec<f64>,
    pub subsample: Vec<f64>,
}

// ============================================================================
// Tracking & Registry
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Log training runs to the tracking server. When false the train stage
    /// runs fully offline.
    pub enabled: bool,
    pub uri: String,
    pub experiment_name: String,
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            uri: defaults::TRACKING_URI.to_string(),
            experiment_name: defaults::EXPERIMENT_NAME.to_string(),
            timeout_secs: defaults::TRACKING_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub model_name_template: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            model_name_template: defaults::MODEL_NAME_TEMPLATE.to_string(),
        }
    }
}

// ============================================================================
// Servers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `NPV_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Bind address; overridden by `NPV_DASHBOARD_ADDR` or `--addr`
    pub addr: String,
    /// Base URL of the prediction service
    pub api_url: String,
    pub predict_timeout_secs: u64,
    pub status_timeout_secs: u64,
    pub history_limit: usize,
    /// Choices offered for the GS field
    pub trajectory_types: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            addr: defaults::DASHBOARD_ADDR.to_string(),
            api_url: defaults::DASHBOARD_API_URL.to_string(),
            predict_timeout_secs: defaults::DASHBOARD_PREDICT_TIMEOUT_SECS,
            status_timeout_secs: defaults::DASHBOARD_STATUS_TIMEOUT_SECS,
            history_limit: defaults::DASHBOARD_HISTORY_LIMIT,
            trajectory_types: defaults::TRAJECTORY_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config = PipelineConfig::from_toml_str("").expect("empty TOML should parse");
        assert_eq!(config.features.target, "NPV");
        assert_eq!(config.features.categorical_columns, vec!["GS".to_string()]);
        assert_eq!(config.preprocessing.random_state, 42);
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.model.hyperparameters.n_estimators, 100);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[model]
name = "boosted"

[model.hyperparameters]
max_depth = 3
learning_rate = 0.05

[training]
scoring = "neg_mean_absolute_error"
"#;
        let config = PipelineConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.model.name, "boosted");
        assert_eq!(config.model.hyperparameters.max_depth, 3);
        assert_eq!(config.model.hyperparameters.learning_rate, 0.05);
        // Non-overridden values retain defaults
        assert_eq!(config.model.hyperparameters.n_estimators, 100);
        assert_eq!(config.training.scoring, crate::model::Scoring::NegMeanAbsoluteError);
        assert_eq!(config.registered_model_name(), "boosted_NPV");
    }

    #[test]
    fn test_validation_catches_target_in_drop_columns() {
        let mut config = PipelineConfig::default();
        config.features.drop_columns.push("NPV".to_string());
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Validation(ref errors)) if errors.iter().any(|e| e.contains("drop_columns"))));
    }

    #[test]
    fn test_validation_catches_bad_test_size() {
        let mut config = PipelineConfig::default();
        config.preprocessing.test_size = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_grid_parses() {
        let toml_str = r#"
[training.search]
n_estimators = [50, 100]
subsample = [0.7, 1.0]
"#;
        let config = PipelineConfig::from_toml_str(toml_str).expect("search grid should parse");
        let grid = config.training.search.expect("grid present");
        assert_eq!(grid.n_estimators, vec![50, 100]);
        assert_eq!(grid.subsample, vec![0.7, 1.0]);
        assert!(grid.max_depth.is_empty());
        assert_eq!(config.training.cv_folds, 5);
    }

    #[test]
    fn test_unknown_scoring_is_parse_error() {
        let result = PipelineConfig::from_toml_str("[training]\nscoring = \"accuracy\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/params.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }
}
