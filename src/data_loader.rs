use std::path::{Path, PathBuf};

use ndarray::Array1;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::artifacts::{self, RAW_FILE, TEST_FILE, TRAIN_FILE};
use crate::config::DataConfig;
use crate::error::{ExamPredictionError, Result};

/// CSV ingestion: reads the raw student table, snapshots it under the
/// artifacts directory, and produces a seeded train/test split.
pub struct DataLoader {
    source_path: PathBuf,
    artifacts_dir: PathBuf,
    test_fraction: f64,
    seed: u64,
}

pub struct IngestionOutcome {
    pub train: DataFrame,
    pub test: DataFrame,
}

impl DataLoader {
    pub fn new(data: &DataConfig) -> Self {
        Self {
            source_path: PathBuf::from(&data.source_path),
            artifacts_dir: PathBuf::from(&data.artifacts_dir),
            test_fraction: data.test_fraction,
            seed: data.split_seed,
        }
    }

    pub fn ingest(&self) -> Result<IngestionOutcome> {
        info!(path = %self.source_path.display(), "reading raw dataset");
        let mut df = read_csv(&self.source_path)?;
        debug!(shape = ?df.shape(), "raw dataset loaded");

        artifacts::write_csv(&self.artifacts_dir.join(RAW_FILE), &mut df)?;

        let (mut train, mut test) = train_test_split(&df, self.test_fraction, self.seed)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            "train/test split complete"
        );

        artifacts::write_csv(&self.artifacts_dir.join(TRAIN_FILE), &mut train)?;
        artifacts::write_csv(&self.artifacts_dir.join(TEST_FILE), &mut test)?;

        Ok(IngestionOutcome { train, test })
    }
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ExamPredictionError::artifact(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "dataset file not found"),
        ));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Seeded shuffle split. `test_fraction` of the rows (rounded) go to the
/// held-out frame; the same seed always produces the same partition.
pub fn train_test_split(
    df: &DataFrame,
    test_fraction: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(ExamPredictionError::config(format!(
            "test_fraction must be in [0, 1), got {test_fraction}"
        )));
    }
    let n_rows = df.height();
    let test_rows = ((n_rows as f64) * test_fraction).round() as usize;

    let mut indices: Vec<u32> = (0..n_rows as u32).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_idx = IdxCa::from_vec("idx".into(), indices[..test_rows].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[test_rows..].to_vec());
    Ok((df.take(&train_idx)?, df.take(&test_idx)?))
}

/// Splits a frame into the modeling inputs and the numeric target vector.
pub fn split_features_and_target(
    df: &DataFrame,
    target_column: &str,
) -> Result<(DataFrame, Array1<f64>)> {
    let target = df
        .column(target_column)
        .map_err(|_| {
            ExamPredictionError::transform(format!(
                "training data is missing target column '{target_column}'"
            ))
        })?
        .cast(&DataType::Float64)?;
    let targets: Vec<f64> = target.f64()?.iter().map(|v| v.unwrap_or(0.0)).collect();
    let features = df.drop(target_column)?;
    Ok((features, Array1::from_vec(targets)))
}
