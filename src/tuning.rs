use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{format_params, ParamAssignment, SearchSpace};
use crate::error::{ExamPredictionError, Result};
use crate::metrics::r2_score;
use crate::models::ModelFamily;

/// Best configuration found by one randomized search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_params: ParamAssignment,
    /// Mean cross-validated R² of the best configuration.
    pub best_cv_score: f64,
}

/// Randomized hyperparameter search: sample `n_iter` configurations from
/// the candidate lists, score each by `cv_folds`-fold cross-validated R² on
/// the training set, and return the best one. An empty search space
/// evaluates exactly one (default) configuration.
pub fn randomized_search(
    family: ModelFamily,
    space: &SearchSpace,
    x: &Array2<f64>,
    y: &Array1<f64>,
    n_iter: usize,
    cv_folds: usize,
    seed: u64,
) -> Result<SearchOutcome> {
    let mut rng = StdRng::seed_from_u64(seed);
    let candidates = sample_assignments(space, n_iter, &mut rng);
    let folds = fold_partition(x.nrows(), cv_folds)?;

    let mut best: Option<SearchOutcome> = None;
    for params in candidates {
        let score = cross_validated_score(family, &params, x, y, &folds)?;
        debug!(
            family = family.name(),
            params = %format_params(&params),
            cv_score = score,
            "search candidate evaluated"
        );
        let improved = best
            .as_ref()
            .map_or(true, |current| score > current.best_cv_score);
        if improved {
            best = Some(SearchOutcome {
                best_params: params,
                best_cv_score: score,
            });
        }
    }

    // sample_assignments always yields at least one candidate
    Ok(best.expect("randomized search evaluated no candidates"))
}

/// Draw `n_iter` assignments, one random candidate per parameter. With no
/// parameters there is only the default assignment to evaluate.
fn sample_assignments(
    space: &SearchSpace,
    n_iter: usize,
    rng: &mut StdRng,
) -> Vec<ParamAssignment> {
    if space.is_empty() || space.values().all(|candidates| candidates.is_empty()) {
        return vec![ParamAssignment::new()];
    }
    (0..n_iter.max(1))
        .map(|_| {
            space
                .iter()
                .filter(|(_, candidates)| !candidates.is_empty())
                .map(|(name, candidates)| {
                    let pick = candidates[rng.gen_range(0..candidates.len())].clone();
                    (name.clone(), pick)
                })
                .collect()
        })
        .collect()
}

/// Contiguous k-fold partition of row indices. Every row appears in exactly
/// one validation fold.
fn fold_partition(n_rows: usize, cv_folds: usize) -> Result<Vec<Vec<usize>>> {
    if cv_folds < 2 {
        return Err(ExamPredictionError::config(format!(
            "cross-validation needs at least 2 folds, got {cv_folds}"
        )));
    }
    if n_rows < cv_folds {
        return Err(ExamPredictionError::config(format!(
            "cannot split {n_rows} training rows into {cv_folds} folds"
        )));
    }
    let mut folds = Vec::with_capacity(cv_folds);
    let base = n_rows / cv_folds;
    let remainder = n_rows % cv_folds;
    let mut start = 0;
    for fold in 0..cv_folds {
        let size = base + usize::from(fold < remainder);
        folds.push((start..start + size).collect());
        start += size;
    }
    Ok(folds)
}

fn cross_validated_score(
    family: ModelFamily,
    params: &ParamAssignment,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[Vec<usize>],
) -> Result<f64> {
    let mut total = 0.0;
    for validation in folds {
        let train: Vec<usize> = (0..x.nrows()).filter(|i| !validation.contains(i)).collect();
        let model = family.fit(
            &x.select(Axis(0), &train),
            &y.select(Axis(0), &train),
            params,
        )?;
        let predictions = model.predict(&x.select(Axis(0), validation));
        total += r2_score(&y.select(Axis(0), validation), &predictions);
    }
    Ok(total / folds.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;

    #[test]
    fn fold_partition_covers_every_row_once() {
        let folds = fold_partition(103, 5).unwrap();
        assert_eq!(folds.len(), 5);
        let mut seen: Vec<usize> = folds.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..103).collect::<Vec<_>>());
    }

    #[test]
    fn too_few_rows_is_a_config_error() {
        assert!(fold_partition(3, 5).is_err());
        assert!(fold_partition(10, 1).is_err());
    }

    #[test]
    fn empty_space_yields_single_default_assignment() {
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sample_assignments(&SearchSpace::new(), 10, &mut rng);
        assert_eq!(sampled, vec![ParamAssignment::new()]);
    }

    #[test]
    fn sampled_values_come_from_the_candidate_lists() {
        let mut space = SearchSpace::new();
        space.insert(
            "max_depth".into(),
            vec![ParamValue::Int(3), ParamValue::Int(5), ParamValue::Int(7)],
        );
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sample_assignments(&space, 20, &mut rng);
        assert_eq!(sampled.len(), 20);
        for assignment in sampled {
            assert!(space["max_depth"].contains(&assignment["max_depth"]));
        }
    }

    #[test]
    fn search_on_linear_data_finds_a_strong_fit() {
        let n = 30;
        let mut x = Array2::zeros((n, 1));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            x[[i, 0]] = i as f64;
            y[i] = 4.0 * i as f64 - 2.0;
        }
        let outcome = randomized_search(
            ModelFamily::LinearRegression,
            &SearchSpace::new(),
            &x,
            &y,
            10,
            5,
            42,
        )
        .unwrap();
        assert!(outcome.best_params.is_empty());
        assert!(outcome.best_cv_score > 0.99);
    }
}
