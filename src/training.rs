use tracing::info;

use crate::artifacts::{self, MODEL_FILE, PREPROCESSOR_FILE, REPORT_FILE};
use crate::config::Config;
use crate::data_loader::{split_features_and_target, DataLoader};
use crate::error::Result;
use crate::model_selection::{evaluate_models, ModelEvaluation};
use crate::models::ModelFamily;
use crate::preprocessing::Preprocessor;

/// What a completed training run produced, for callers and logs. The
/// fitted artifacts themselves are on disk by the time this is returned.
#[derive(Debug)]
pub struct TrainingSummary {
    pub best_name: String,
    pub best_score: f64,
    pub evaluations: Vec<ModelEvaluation>,
}

/// Runs the full offline pipeline: ingest, fit the preprocessor on the
/// training split only, evaluate every model family, and persist the fitted
/// preprocessor, the winning model and the ranked report.
pub fn run(config: &Config) -> Result<TrainingSummary> {
    let loader = DataLoader::new(&config.data);
    let ingested = loader.ingest()?;

    let (train_features, y_train) =
        split_features_and_target(&ingested.train, &config.data.target_column)?;
    let (test_features, y_test) =
        split_features_and_target(&ingested.test, &config.data.target_column)?;

    let (preprocessor, x_train) = Preprocessor::fit_transform(&train_features)?;
    let x_test = preprocessor.transform(&test_features)?;
    info!(
        train_shape = ?x_train.dim(),
        test_shape = ?x_test.dim(),
        "feature matrices built"
    );

    let outcome = evaluate_models(
        &ModelFamily::ALL,
        &config.search_space,
        &config.tuning,
        &x_train,
        &y_train,
        &x_test,
        &y_test,
    )?;

    artifacts::write_model_report(&config.artifact_path(REPORT_FILE), &outcome.evaluations)?;
    artifacts::save_json(&config.artifact_path(PREPROCESSOR_FILE), &preprocessor)?;
    artifacts::save_json(&config.artifact_path(MODEL_FILE), &outcome.best_model)?;
    info!(
        best = %outcome.best_name,
        score = outcome.best_score,
        "training run complete, artifacts persisted"
    );

    Ok(TrainingSummary {
        best_name: outcome.best_name,
        best_score: outcome.best_score,
        evaluations: outcome.evaluations,
    })
}
