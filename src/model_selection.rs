use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use tracing::{error, info};

use crate::config::{self, format_params, ParamAssignment, SearchSpace, TuningConfig};
use crate::error::{ExamPredictionError, Result};
use crate::metrics::regression_metrics;
use crate::models::{FittedModel, ModelFamily};
use crate::tuning::randomized_search;

/// Per-family evaluation record, exported to the model report.
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub family: String,
    pub vanilla_score: f64,
    pub best_params: ParamAssignment,
    /// Mean cross-validated R² of the best-found configuration.
    pub cv_score: f64,
    pub tuned_score: f64,
    pub best_score: f64,
    pub tuned_better: bool,
}

/// Result of one full selection run: the audit report for every family plus
/// the single winning fitted model.
#[derive(Debug)]
pub struct SelectionOutcome {
    pub evaluations: Vec<ModelEvaluation>,
    pub best_name: String,
    pub best_score: f64,
    pub best_model: FittedModel,
}

/// Evaluates every family in order: vanilla fit, randomized search, tuned
/// refit, held-out R² for both. The winner is the family with the highest
/// `best_score`; earlier families win ties. A winner below
/// `tuning.score_threshold` fails the run.
pub fn evaluate_models(
    families: &[ModelFamily],
    search_spaces: &BTreeMap<String, SearchSpace>,
    tuning: &TuningConfig,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<SelectionOutcome> {
    let mut evaluations = Vec::with_capacity(families.len());
    let mut fitted: Vec<Option<FittedModel>> = Vec::with_capacity(families.len());

    for family in families {
        let space = config::search_space_for(search_spaces, family.name()).map_err(|err| {
            error!(family = family.name(), "missing search space");
            err
        })?;

        let (evaluation, model) =
            evaluate_family(*family, space, tuning, x_train, y_train, x_test, y_test)?;
        info!(
            family = family.name(),
            vanilla = evaluation.vanilla_score,
            tuned = evaluation.tuned_score,
            best = evaluation.best_score,
            "family evaluated"
        );
        evaluations.push(evaluation);
        fitted.push(Some(model));
    }

    let mut winner_index = 0;
    for (index, evaluation) in evaluations.iter().enumerate() {
        if evaluation.best_score > evaluations[winner_index].best_score {
            winner_index = index;
        }
    }

    let best_name = evaluations[winner_index].family.clone();
    let best_score = evaluations[winner_index].best_score;
    if best_score < tuning.score_threshold {
        error!(
            best = %best_name,
            score = best_score,
            threshold = tuning.score_threshold,
            "no model met the acceptability threshold"
        );
        return Err(ExamPredictionError::BestModelBelowThreshold {
            name: best_name,
            score: best_score,
            threshold: tuning.score_threshold,
        });
    }

    let best_model = fitted[winner_index]
        .take()
        .expect("winning model fitted exactly once");
    info!(
        best = %best_name,
        score = best_score,
        tuned_better = evaluations[winner_index].tuned_better,
        "best model selected"
    );

    Ok(SelectionOutcome {
        evaluations,
        best_name,
        best_score,
        best_model,
    })
}

fn evaluate_family(
    family: ModelFamily,
    space: &SearchSpace,
    tuning: &TuningConfig,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<(ModelEvaluation, FittedModel)> {
    let vanilla = family.fit(x_train, y_train, &ParamAssignment::new())?;
    let vanilla_metrics = regression_metrics(y_test, &vanilla.predict(x_test));
    let vanilla_score = vanilla_metrics.r_squared;

    let search = randomized_search(
        family,
        space,
        x_train,
        y_train,
        tuning.n_iter,
        tuning.cv_folds,
        tuning.seed,
    )?;
    let tuned = family.fit(x_train, y_train, &search.best_params)?;
    let tuned_metrics = regression_metrics(y_test, &tuned.predict(x_test));
    let tuned_score = tuned_metrics.r_squared;

    let tuned_better = tuned_score > vanilla_score;
    let best_score = vanilla_score.max(tuned_score);
    let (model, kept, held_out) = if tuned_score >= vanilla_score {
        (tuned, "tuned", tuned_metrics)
    } else {
        (vanilla, "vanilla", vanilla_metrics)
    };
    info!(
        family = family.name(),
        params = %format_params(&search.best_params),
        kept,
        mae = held_out.mae,
        rmse = held_out.rmse,
        "family fit complete"
    );

    Ok((
        ModelEvaluation {
            family: family.name().to_string(),
            vanilla_score,
            best_params: search.best_params,
            cv_score: search.best_cv_score,
            tuned_score,
            best_score,
            tuned_better,
        },
        model,
    ))
}
