//! System-wide default constants.
//!
//! Centralises the default paths, ports and tuning values used when
//! `params.toml` omits a key. Grouped by subsystem for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "NPV_CONFIG";

/// Config file looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "params.toml";

// ============================================================================
// Data & artifacts
// ============================================================================

pub const RAW_DATA_PATH: &str = "data/raw/wells.xlsx";
pub const PROCESSED_SPLIT_PATH: &str = "data/processed/split.json";

pub const MODEL_PATH: &str = "models/model.json";
pub const ENCODER_PATH: &str = "models/encoder.json";
pub const FEATURE_COLUMNS_PATH: &str = "models/feature_columns.json";
pub const METRICS_PATH: &str = "models/metrics.json";
pub const EVALUATION_PATH: &str = "models/evaluation.json";
pub const REPORT_PATH: &str = "reports/model_report.json";
pub const REGISTRY_STATUS_PATH: &str = "reports/registry_status.json";

// ============================================================================
// Features
// ============================================================================

pub const TARGET_COLUMN: &str = "NPV";

/// Production-rate columns present in the raw export but not known at
/// prediction time.
pub const DROP_COLUMNS: [&str; 4] = ["cond rate", "gas rate", "sum cond", "sum gas"];

pub const CATEGORICAL_COLUMNS: [&str; 1] = ["GS"];

// ============================================================================
// Preprocessing & training
// ============================================================================

pub const TEST_SIZE: f64 = 0.2;
pub const RANDOM_STATE: u64 = 42;

pub const MODEL_NAME: &str = "gbdt";
pub const N_ESTIMATORS: usize = 100;
pub const MAX_DEPTH: u32 = 5;
pub const LEARNING_RATE: f64 = 0.1;
pub const SUBSAMPLE: f64 = 1.0;
pub const COLSAMPLE: f64 = 1.0;
pub const MIN_LEAF_SIZE: usize = 1;

pub const CV_FOLDS: usize = 5;

// ============================================================================
// Tracking & registry
// ============================================================================

pub const TRACKING_URI: &str = "http://localhost:5000";
pub const EXPERIMENT_NAME: &str = "NPV_Prediction";

/// HTTP timeout for tracking server requests (seconds).
pub const TRACKING_HTTP_TIMEOUT_SECS: u64 = 30;

/// `{name}` is replaced with `model.name`.
pub const MODEL_NAME_TEMPLATE: &str = "{name}_NPV";

// ============================================================================
// Prediction service
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8000";

/// Upper bound on a `/predict` request body (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

// ============================================================================
// Dashboard
// ============================================================================

pub const DASHBOARD_ADDR: &str = "0.0.0.0:8501";
pub const DASHBOARD_API_URL: &str = "http://localhost:8000";

/// Timeout for `/predict` calls issued by the dashboard (seconds).
pub const DASHBOARD_PREDICT_TIMEOUT_SECS: u64 = 10;

/// Timeout for `/health` and `/model_info` status checks (seconds).
pub const DASHBOARD_STATUS_TIMEOUT_SECS: u64 = 5;

/// In-session prediction history capacity.
pub const DASHBOARD_HISTORY_LIMIT: usize = 100;

pub const TRAJECTORY_TYPES: [&str; 5] = ["S-TYPE", "U-TYPE", "VGS", "GS", "NGS"];
