use std::fs::{self, File, OpenOptions};
use std::path::Path;

use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ExamPredictionError, Result};
use crate::model_selection::ModelEvaluation;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "model.json";
pub const REPORT_FILE: &str = "model_report.csv";
pub const AUDIT_LOG_FILE: &str = "prediction_logs.csv";
pub const RAW_FILE: &str = "raw.csv";
pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";

/// Serializes a fitted artifact to a JSON blob, creating the artifacts
/// directory on first use.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| ExamPredictionError::artifact(path, e))?;
    serde_json::to_writer(file, value).map_err(|e| ExamPredictionError::ArtifactFormat {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), "artifact saved");
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| ExamPredictionError::artifact(path, e))?;
    let value = serde_json::from_reader(file).map_err(|e| ExamPredictionError::ArtifactFormat {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "artifact loaded");
    Ok(value)
}

pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| ExamPredictionError::artifact(path, e))?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "csv written");
    Ok(())
}

/// Writes the ranked per-family report, sorted descending by tuned score.
/// Informational only; nothing reads it back.
pub fn write_model_report(path: &Path, evaluations: &[ModelEvaluation]) -> Result<()> {
    let families: Vec<&str> = evaluations.iter().map(|e| e.family.as_str()).collect();
    let vanilla: Vec<f64> = evaluations.iter().map(|e| e.vanilla_score).collect();
    let params: Vec<String> = evaluations
        .iter()
        .map(|e| crate::config::format_params(&e.best_params))
        .collect();
    let cv: Vec<f64> = evaluations.iter().map(|e| e.cv_score).collect();
    let tuned: Vec<f64> = evaluations.iter().map(|e| e.tuned_score).collect();

    let df = DataFrame::new(vec![
        Column::new("model".into(), families),
        Column::new("vanilla_score".into(), vanilla),
        Column::new("best_params".into(), params),
        Column::new("best_cv_score".into(), cv),
        Column::new("tuned_score".into(), tuned),
    ])?;
    let mut ranked = df.sort(
        ["tuned_score"],
        SortMultipleOptions::default().with_order_descending(true),
    )?;
    write_csv(path, &mut ranked)?;
    info!(path = %path.display(), "model report exported");
    Ok(())
}

/// Appends rows to the audit log. The header is written only when the file
/// does not exist yet.
pub fn append_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    ensure_parent_dir(path)?;
    let exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ExamPredictionError::artifact(path, e))?;
    CsvWriter::new(file).include_header(!exists).finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "audit rows appended");
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ExamPredictionError::artifact(parent, e))?;
        }
    }
    Ok(())
}
