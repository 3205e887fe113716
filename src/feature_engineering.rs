use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Denominator clamp for `academic_focus_seconds`. A zero attendance value
/// would otherwise divide by zero; the clamp applies identically at fit and
/// at serving time because both paths go through [`FeatureAugmenter::transform`].
pub const ATTENDANCE_EPSILON: f64 = 1e-6;

pub const DERIVED_COLUMNS: [&str; 3] =
    ["academic_effort", "academic_focus_seconds", "productivity"];

/// Derives composite study features from the raw numeric columns.
///
/// `fit` only records the incoming column names; no statistics are learned.
/// `transform` drops the `id` column if present and appends three derived
/// columns:
///   - `academic_effort   = study_hours * class_attendance`
///   - `academic_focus_seconds = study_hours / class_attendance * 3600`
///   - `productivity      = study_hours * sleep_hours`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureAugmenter {
    feature_names_in: Vec<String>,
}

impl FeatureAugmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame) {
        self.feature_names_in = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        debug!(columns = ?self.feature_names_in, "feature augmenter fitted");
    }

    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();

        if out.get_column_names().iter().any(|name| name.as_str() == "id") {
            debug!("dropping id column");
            out = out.drop("id")?;
        }

        let study_hours = out.column("study_hours")?.f64()?.clone();
        let attendance = out.column("class_attendance")?.f64()?.clone();
        let sleep_hours = out.column("sleep_hours")?.f64()?.clone();

        let effort = (&study_hours * &attendance).with_name("academic_effort".into());

        let clamped = attendance.apply_values(|v| v.max(ATTENDANCE_EPSILON));
        let focus_seconds =
            (&(&study_hours / &clamped) * 3600.0).with_name("academic_focus_seconds".into());

        let productivity = (&study_hours * &sleep_hours).with_name("productivity".into());

        out.with_column(effort.into_series())?;
        out.with_column(focus_seconds.into_series())?;
        out.with_column(productivity.into_series())?;

        Ok(out)
    }

    /// Output column names after the `id` drop and the derived appends.
    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .feature_names_in
            .iter()
            .filter(|name| name.as_str() != "id")
            .cloned()
            .collect();
        names.extend(DERIVED_COLUMNS.iter().map(|s| s.to_string()));
        names
    }
}
