use std::path::PathBuf;

use polars::error::PolarsError;
use thiserror::Error;

/// Errors surfaced by the training and serving pipelines. Every failing
/// stage wraps its cause with enough context (model family, artifact path)
/// to be actionable from the log alone.
#[derive(Debug, Error)]
pub enum ExamPredictionError {
    #[error("data error: {0}")]
    Data(#[from] PolarsError),

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("no acceptable model: best candidate '{name}' scored {score:.4}, below threshold {threshold}")]
    BestModelBelowThreshold {
        name: String,
        score: f64,
        threshold: f64,
    },

    #[error("model training error ({family}): {reason}")]
    ModelTraining { family: String, reason: String },

    #[error("transform error: {reason}")]
    Transform { reason: String },

    #[error("artifact I/O error at {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact serialization error at {path:?}: {source}")]
    ArtifactFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExamPredictionError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn transform(reason: impl Into<String>) -> Self {
        Self::Transform {
            reason: reason.into(),
        }
    }

    pub fn training(family: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelTraining {
            family: family.into(),
            reason: reason.into(),
        }
    }

    pub fn artifact(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExamPredictionError>;
