//! Config validation: unknown-key detection with Levenshtein suggestions
//! and numeric range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break an existing config.

use std::collections::HashSet;

use super::PipelineConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `PipelineConfig`.
///
/// Maintained manually to match the struct hierarchy in pipeline_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [data]
        "data",
        "data.raw_path",
        "data.processed_path",
        // [artifacts]
        "artifacts",
        "artifacts.model_path",
        "artifacts.encoder_path",
        "artifacts.feature_columns_path",
        "artifacts.metrics_path",
        "artifacts.evaluation_path",
        "artifacts.report_path",
        "artifacts.registry_status_path",
        // [features]
        "features",
        "features.target",
        "features.drop_columns",
        "features.categorical_columns",
        // [preprocessing]
        "preprocessing",
        "preprocessing.test_size",
        "preprocessing.random_state",
        // [model]
        "model",
        "model.name",
        "model.hyperparameters",
        "model.hyperparameters.n_estimators",
        "model.hyperparameters.max_depth",
        "model.hyperparameters.learning_rate",
        "model.hyperparameters.subsample",
        "model.hyperparameters.colsample",
        "model.hyperparameters.min_leaf_size",
        // [training]
        "training",
        "training.cv_folds",
        "training.scoring",
        "training.search",
        "training.search.n_estimators",
        "training.search.max_depth",
        "training.search.learning_rate",
        "training.search.subsample",
        // [tracking]
        "tracking",
        "tracking.enabled",
        "tracking.uri",
        "tracking.experiment_name",
        "tracking.timeout_secs",
        // [registry]
        "registry",
        "registry.model_name_template",
        // [server]
        "server",
        "server.addr",
        // [dashboard]
        "dashboard",
        "dashboard.addr",
        "dashboard.api_url",
        "dashboard.predict_timeout_secs",
        "dashboard.status_timeout_secs",
        "dashboard.history_limit",
        "dashboard.trajectory_types",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // tie-break on the key so the suggestion does not depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Check numeric settings. Returns one message per violated constraint.
pub fn validate_ranges(config: &PipelineConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let test_size = config.preprocessing.test_size;
    if !(test_size > 0.0 && test_size < 1.0) {
        errors.push(format!(
            "preprocessing.test_size = {test_size} must be strictly between 0 and 1"
        ));
    }

    let hp = &config.model.hyperparameters;
    if hp.n_estimators == 0 {
        errors.push("model.hyperparameters.n_estimators must be > 0".to_string());
    }
    if hp.max_depth == 0 {
        errors.push("model.hyperparameters.max_depth must be > 0".to_string());
    }
    if !(hp.learning_rate.is_finite() && hp.learning_rate > 0.0) {
        errors.push(format!(
            "model.hyperparameters.learning_rate = {} must be a positive finite number",
            hp.learning_rate
        ));
    }
    for (name, ratio) in [("subsample", hp.subsample), ("colsample", hp.colsample)] {
        if !(ratio > 0.0 && ratio <= 1.0) {
            errors.push(format!(
                "model.hyperparameters.{name} = {ratio} must be in (0, 1]"
            ));
        }
    }
    if hp.min_leaf_size == 0 {
        errors.push("model.hyperparameters.min_leaf_size must be > 0".to_string());
    }

    if let Some(grid) = &config.training.search {
        if grid.n_estimators.contains(&0) {
            errors.push("training.search.n_estimators values must be > 0".to_string());
        }
        if grid.max_depth.contains(&0) {
            errors.push("training.search.max_depth values must be > 0".to_string());
        }
        if let Some(lr) = grid
            .learning_rate
            .iter()
            .find(|lr| !(lr.is_finite() && **lr > 0.0))
        {
            errors.push(format!(
                "training.search.learning_rate value {lr} must be a positive finite number"
            ));
        }
        if let Some(ratio) = grid.subsample.iter().find(|r| !(**r > 0.0 && **r <= 1.0)) {
            errors.push(format!(
                "training.search.subsample value {ratio} must be in (0, 1]"
            ));
        }
    }

    if config.training.cv_folds < 2 {
        errors.push(format!(
            "training.cv_folds = {} must be at least 2",
            config.training.cv_folds
        ));
    }

    if config.tracking.timeout_secs == 0 {
        errors.push("tracking.timeout_secs must be > 0".to_string());
    }
    if config.dashboard.predict_timeout_secs == 0 || config.dashboard.status_timeout_secs == 0 {
        errors.push("dashboard timeouts must be > 0".to_string());
    }
    if config.dashboard.history_limit == 0 {
        errors.push("dashboard.history_limit must be > 0".to_string());
    }

    errors
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("learning_rat", "learning_rate"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [model]
            name = "gbdt"
            [model.hyperparameters]
            max_depth = 4
        "#
        .parse()
        .unwrap();
        let mut keys = walk_toml_keys(&toml, "");
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "model",
                "model.hyperparameters",
                "model.hyperparameters.max_depth",
                "model.name"
            ]
        );
    }

    #[test]
    fn test_default_ranges_are_valid() {
        assert!(validate_ranges(&PipelineConfig::default()).is_empty());
    }

    #[test]
    fn test_zero_cv_folds_rejected() {
        let mut config = PipelineConfig::default();
        config.training.cv_folds = 1;
        let errors = validate_ranges(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cv_folds"));
    }

    #[test]
    fn test_search_grid_values_checked() {
        let mut config = PipelineConfig::default();
        config.training.search = Some(crate::config::SearchConfig {
            n_estimators: vec![10, 0],
            max_depth: vec![3],
            learning_rate: vec![0.1],
            subsample: vec![0.7, 1.5],
        });
        let errors = validate_ranges(&config);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("search.n_estimators")));
        assert!(errors.iter().any(|e| e.contains("search.subsample")));
    }

    #[test]
    fn test_nan_learning_rate_rejected() {
        let mut config = PipelineConfig::default();
        config.model.hyperparameters.learning_rate = f64::NAN;
        assert!(validate_ranges(&config)
            .iter()
            .any(|e| e.contains("learning_rate")));
    }
}
