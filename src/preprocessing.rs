use std::collections::BTreeMap;

use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExamPredictionError, Result};
use crate::feature_engineering::FeatureAugmenter;

/// Unfit preprocessing pipeline. `fit` inspects the training frame once and
/// produces an immutable [`FittedPreprocessor`]; all later applications go
/// through that fitted value and never re-estimate anything.
pub struct Preprocessor;

/// Fit-time parameters of the full preprocessing pipeline.
///
/// Columns are routed by the training frame's dtypes: numeric columns flow
/// through median imputation, feature augmentation and standard scaling;
/// everything else is treated as categorical and flows through mode
/// imputation, one-hot encoding and scale-only standardization. The output
/// matrix is always `[numeric block | categorical block]` in the order
/// recorded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    /// Median per numeric column, same order as `numeric_columns`.
    medians: Vec<f64>,
    /// Most frequent value per categorical column (ties broken by the
    /// lexicographically smallest category).
    modes: Vec<String>,
    /// Sorted category vocabulary per categorical column.
    vocabularies: Vec<Vec<String>>,
    augmenter: FeatureAugmenter,
    /// Mean/scale per augmented numeric output column.
    numeric_means: Vec<f64>,
    numeric_scales: Vec<f64>,
    /// Scale per one-hot output column (no centering for encoded columns).
    categorical_scales: Vec<f64>,
    feature_names: Vec<String>,
}

impl Preprocessor {
    /// Learns imputation statistics, the one-hot vocabulary and the scaling
    /// parameters from `train` only.
    pub fn fit(train: &DataFrame) -> Result<FittedPreprocessor> {
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        for col in train.get_columns() {
            if col.dtype().is_numeric() {
                numeric_columns.push(col.name().to_string());
            } else {
                categorical_columns.push(col.name().to_string());
            }
        }
        info!(
            numeric = numeric_columns.len(),
            categorical = categorical_columns.len(),
            "column routing fixed at fit time"
        );

        let mut medians = Vec::with_capacity(numeric_columns.len());
        for name in &numeric_columns {
            let casted = train.column(name)?.cast(&DataType::Float64)?;
            let median = casted.f64()?.median().ok_or_else(|| {
                ExamPredictionError::transform(format!(
                    "numeric column '{name}' has no observed values to fit on"
                ))
            })?;
            medians.push(median);
        }

        let mut modes = Vec::with_capacity(categorical_columns.len());
        let mut vocabularies = Vec::with_capacity(categorical_columns.len());
        for name in &categorical_columns {
            let casted = train.column(name)?.cast(&DataType::String)?;
            let ca = casted.str()?;
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in ca.iter().flatten() {
                *counts.entry(value).or_insert(0) += 1;
            }
            let mode = counts
                .iter()
                .fold(None::<(&str, usize)>, |best, (&value, &count)| match best {
                    Some((_, best_count)) if count <= best_count => best,
                    _ => Some((value, count)),
                })
                .map(|(value, _)| value.to_string())
                .ok_or_else(|| {
                    ExamPredictionError::transform(format!(
                        "categorical column '{name}' has no observed values to fit on"
                    ))
                })?;
            let vocabulary: Vec<String> = counts.keys().map(|v| v.to_string()).collect();
            debug!(column = %name, mode = %mode, categories = vocabulary.len(), "categorical branch fitted");
            modes.push(mode);
            vocabularies.push(vocabulary);
        }

        let mut fitted = FittedPreprocessor {
            numeric_columns,
            categorical_columns,
            medians,
            modes,
            vocabularies,
            augmenter: FeatureAugmenter::new(),
            numeric_means: Vec::new(),
            numeric_scales: Vec::new(),
            categorical_scales: Vec::new(),
            feature_names: Vec::new(),
        };

        let imputed = fitted.imputed_numeric_frame(train)?;
        fitted.augmenter.fit(&imputed);
        let augmented = fitted.augmenter.transform(&imputed)?;
        let numeric = frame_to_matrix(&augmented)?;
        for column in numeric.axis_iter(Axis(1)) {
            fitted.numeric_means.push(column.mean().unwrap_or(0.0));
            fitted.numeric_scales.push(nonzero(column.std(0.0)));
        }

        let encoded = fitted.one_hot_matrix(train)?;
        for column in encoded.axis_iter(Axis(1)) {
            fitted.categorical_scales.push(nonzero(column.std(0.0)));
        }

        fitted.feature_names = fitted.augmenter.feature_names_out();
        for (name, vocabulary) in fitted
            .categorical_columns
            .iter()
            .zip(fitted.vocabularies.iter())
        {
            for category in vocabulary {
                fitted.feature_names.push(format!("{name}_{category}"));
            }
        }
        info!(output_width = fitted.feature_names.len(), "preprocessor fitted");

        Ok(fitted)
    }

    /// Fit on `train` and return the fitted pipeline together with the
    /// training feature matrix.
    pub fn fit_transform(train: &DataFrame) -> Result<(FittedPreprocessor, Array2<f64>)> {
        let fitted = Self::fit(train)?;
        let matrix = fitted.transform(train)?;
        Ok((fitted, matrix))
    }
}

impl FittedPreprocessor {
    /// Applies the fitted pipeline. Uses only parameters learned at fit
    /// time; the argument frame never influences the fitted state.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.validate_columns(df)?;

        let imputed = self.imputed_numeric_frame(df)?;
        let augmented = self.augmenter.transform(&imputed)?;
        let mut numeric = frame_to_matrix(&augmented)?;
        for (j, mut column) in numeric.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, scale) = (self.numeric_means[j], self.numeric_scales[j]);
            column.mapv_inplace(|v| (v - mean) / scale);
        }

        let mut encoded = self.one_hot_matrix(df)?;
        for (j, mut column) in encoded.axis_iter_mut(Axis(1)).enumerate() {
            let scale = self.categorical_scales[j];
            column.mapv_inplace(|v| v / scale);
        }

        ndarray::concatenate(Axis(1), &[numeric.view(), encoded.view()]).map_err(|e| {
            ExamPredictionError::transform(format!("failed to assemble feature matrix: {e}"))
        })
    }

    /// Ordered output schema of the transformed matrix.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn output_width(&self) -> usize {
        self.feature_names.len()
    }

    fn validate_columns(&self, df: &DataFrame) -> Result<()> {
        for name in self
            .numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
        {
            if df.column(name).is_err() {
                return Err(ExamPredictionError::transform(format!(
                    "input is missing expected column '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Numeric columns in fit order, cast to f64, nulls replaced by the
    /// fit-time median.
    fn imputed_numeric_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.numeric_columns.len());
        for (name, median) in self.numeric_columns.iter().zip(self.medians.iter()) {
            let casted = df.column(name)?.cast(&DataType::Float64)?;
            let filled = casted
                .f64()?
                .fill_null_with_values(*median)?
                .with_name(name.as_str().into());
            columns.push(filled.into_series().into_column());
        }
        Ok(DataFrame::new(columns)?)
    }

    /// One-hot block before scaling. Nulls take the fit-time mode; values
    /// outside the fit-time vocabulary encode as an all-zero block.
    fn one_hot_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let width: usize = self.vocabularies.iter().map(|v| v.len()).sum();
        let mut matrix = Array2::zeros((df.height(), width));
        let mut offset = 0;
        for ((name, mode), vocabulary) in self
            .categorical_columns
            .iter()
            .zip(self.modes.iter())
            .zip(self.vocabularies.iter())
        {
            let casted = df.column(name)?.cast(&DataType::String)?;
            let ca = casted.str()?;
            for (row, value) in ca.iter().enumerate() {
                let value = value.unwrap_or(mode.as_str());
                if let Ok(pos) = vocabulary.binary_search_by(|c| c.as_str().cmp(value)) {
                    matrix[[row, offset + pos]] = 1.0;
                }
            }
            offset += vocabulary.len();
        }
        Ok(matrix)
    }
}

/// Dense copy of an all-f64 frame, rows x columns.
fn frame_to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((df.height(), df.width()));
    for (j, col) in df.get_columns().iter().enumerate() {
        let ca = col.f64()?;
        for (i, value) in ca.iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or(0.0);
        }
    }
    Ok(matrix)
}

/// Standard-scaler convention: a constant column keeps its values instead
/// of dividing by zero.
fn nonzero(std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() {
        1.0
    } else {
        std
    }
}
