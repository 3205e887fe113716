use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExamPredictionError, Result};

/// Candidate values for one hyperparameter.
pub type ParamCandidates = Vec<ParamValue>;

/// Search space for one model family: parameter name -> candidate values.
pub type SearchSpace = BTreeMap<String, ParamCandidates>;

/// One sampled hyperparameter configuration.
pub type ParamAssignment = BTreeMap<String, ParamValue>;

/// Training-time configuration, loaded from a TOML file at pipeline start.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub tuning: TuningConfig,
    /// Family name -> hyperparameter search space. Every evaluated family
    /// must have an entry, even if the table is empty.
    #[serde(default)]
    pub search_space: BTreeMap<String, SearchSpace>,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    pub source_path: String,
    pub artifacts_dir: String,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub split_seed: u64,
}

#[derive(Debug, Deserialize)]
pub struct TuningConfig {
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

fn default_target_column() -> String {
    "exam_score".to_string()
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_n_iter() -> usize {
    10
}

fn default_cv_folds() -> usize {
    5
}

fn default_score_threshold() -> f64 {
    0.6
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| ExamPredictionError::artifact(path.as_ref(), e))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ExamPredictionError::config(format!("invalid config file: {e}")))?;
        Ok(config)
    }

    /// Search space for a model family; a missing entry is a config error.
    pub fn search_space_for(&self, family: &str) -> Result<&SearchSpace> {
        search_space_for(&self.search_space, family)
    }

    pub fn artifacts_dir(&self) -> &Path {
        Path::new(&self.data.artifacts_dir)
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.artifacts_dir().join(file_name)
    }
}

/// Looks up a family's search space in an already-parsed map. Keeps the
/// missing-entry error text in one place for config users and the selector.
pub fn search_space_for<'a>(
    spaces: &'a BTreeMap<String, SearchSpace>,
    family: &str,
) -> Result<&'a SearchSpace> {
    spaces.get(family).ok_or_else(|| {
        ExamPredictionError::config(format!(
            "no hyperparameter search space declared for model family '{family}'"
        ))
    })
}

/// A single hyperparameter value as it appears in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ParamValue::Int(v) if *v >= 0 && *v <= u32::MAX as i64 => Some(*v as u32),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Render an assignment as `k=v, k=v` for reports and logs.
pub fn format_params(params: &ParamAssignment) -> String {
    if params.is_empty() {
        return "default".to_string();
    }
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"
            [data]
            source_path = "data/students.csv"
            artifacts_dir = "artifacts"

            [tuning]
            n_iter = 4
            cv_folds = 3

            [search_space."Linear Regression"]

            [search_space."Decision Tree"]
            max_depth = [3, 5, 7]
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.tuning.n_iter, 4);
        assert_eq!(config.tuning.cv_folds, 3);
        // defaults fill in the rest
        assert_eq!(config.tuning.seed, 42);
        assert!((config.tuning.score_threshold - 0.6).abs() < 1e-12);
        assert_eq!(config.data.target_column, "exam_score");

        let space = config.search_space_for("Decision Tree").unwrap();
        assert_eq!(
            space["max_depth"],
            vec![ParamValue::Int(3), ParamValue::Int(5), ParamValue::Int(7)]
        );
        assert!(config.search_space_for("Linear Regression").unwrap().is_empty());
    }

    #[test]
    fn missing_search_space_is_config_error() {
        let raw = r#"
            [data]
            source_path = "data/students.csv"
            artifacts_dir = "artifacts"

            [tuning]
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.search_space_for("CatBoost").is_err());
    }

    #[test]
    fn formats_param_assignments() {
        let mut params = ParamAssignment::new();
        assert_eq!(format_params(&params), "default");
        params.insert("max_depth".into(), ParamValue::Int(5));
        params.insert("shrinkage".into(), ParamValue::Float(0.1));
        assert_eq!(format_params(&params), "max_depth=5, shrinkage=0.1");
    }
}
