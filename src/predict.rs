use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifacts::{self, AUDIT_LOG_FILE, MODEL_FILE, PREPROCESSOR_FILE};
use crate::error::{ExamPredictionError, Result};
use crate::models::FittedModel;
use crate::preprocessing::FittedPreprocessor;

/// The agreed serving-input column order. Incoming records are reordered to
/// this before transforming, so callers may supply fields in any order.
pub const CANONICAL_COLUMNS: [&str; 12] = [
    "id",
    "age",
    "gender",
    "course",
    "study_hours",
    "class_attendance",
    "internet_access",
    "sleep_hours",
    "sleep_quality",
    "study_method",
    "facility_rating",
    "exam_difficulty",
];

/// One raw student observation as submitted for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: i64,
    pub age: f64,
    pub gender: String,
    pub course: String,
    pub study_hours: f64,
    pub class_attendance: f64,
    pub internet_access: String,
    pub sleep_hours: f64,
    pub sleep_quality: String,
    pub study_method: String,
    pub facility_rating: String,
    pub exam_difficulty: String,
}

impl StudentRecord {
    /// Single-row frame in canonical column order.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Column::new("id".into(), vec![self.id]),
            Column::new("age".into(), vec![self.age]),
            Column::new("gender".into(), vec![self.gender.as_str()]),
            Column::new("course".into(), vec![self.course.as_str()]),
            Column::new("study_hours".into(), vec![self.study_hours]),
            Column::new("class_attendance".into(), vec![self.class_attendance]),
            Column::new("internet_access".into(), vec![self.internet_access.as_str()]),
            Column::new("sleep_hours".into(), vec![self.sleep_hours]),
            Column::new("sleep_quality".into(), vec![self.sleep_quality.as_str()]),
            Column::new("study_method".into(), vec![self.study_method.as_str()]),
            Column::new("facility_rating".into(), vec![self.facility_rating.as_str()]),
            Column::new("exam_difficulty".into(), vec![self.exam_difficulty.as_str()]),
        ])?;
        Ok(df)
    }
}

/// Loads the persisted preprocessor and model and scores single records.
///
/// Artifacts are read fresh at `open` time and treated as immutable
/// afterwards; a new pipeline is opened per serving invocation.
pub struct PredictPipeline {
    preprocessor: FittedPreprocessor,
    model: FittedModel,
    audit_log_path: PathBuf,
}

impl PredictPipeline {
    pub fn open(artifacts_dir: &Path) -> Result<Self> {
        let preprocessor: FittedPreprocessor =
            artifacts::load_json(&artifacts_dir.join(PREPROCESSOR_FILE))?;
        let model: FittedModel = artifacts::load_json(&artifacts_dir.join(MODEL_FILE))?;
        info!(
            model = model.family_name(),
            features = preprocessor.output_width(),
            "serving pipeline opened"
        );
        Ok(Self {
            preprocessor,
            model,
            audit_log_path: artifacts_dir.join(AUDIT_LOG_FILE),
        })
    }

    pub fn predict(&self, record: &StudentRecord) -> Result<f64> {
        self.predict_frame(&record.to_dataframe()?)
    }

    /// Scores a single-row frame. Columns may arrive in any order; they are
    /// reordered to [`CANONICAL_COLUMNS`] before the (already fitted)
    /// transform is applied.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<f64> {
        let ordered = df.select(CANONICAL_COLUMNS).map_err(|e| {
            ExamPredictionError::transform(format!("serving input is malformed: {e}"))
        })?;

        let matrix = self.preprocessor.transform(&ordered)?;
        let predictions = self.model.predict(&matrix);
        let prediction = predictions.get(0).copied().ok_or_else(|| {
            ExamPredictionError::transform("serving input produced no rows".to_string())
        })?;
        debug!(prediction, "record scored");

        // Best-effort audit logging: a failed append must not fail the
        // prediction itself.
        if let Err(e) = self.append_audit_row(&ordered, prediction) {
            warn!(error = %e, path = %self.audit_log_path.display(), "audit log write failed");
        }

        Ok(prediction)
    }

    fn append_audit_row(&self, ordered: &DataFrame, prediction: f64) -> Result<()> {
        let mut row = ordered.clone();
        row.with_column(Series::new(
            "predicted_score".into(),
            vec![prediction; ordered.height()],
        ))?;
        artifacts::append_csv(&self.audit_log_path, &mut row)
    }
}
