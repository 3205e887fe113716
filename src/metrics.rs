use ndarray::Array1;

/// Held-out regression metrics for one fitted model.
#[derive(Debug, Clone)]
pub struct RegressionMetrics {
    pub r_squared: f64,
    pub mae: f64,
    pub rmse: f64,
}

pub fn regression_metrics(actuals: &Array1<f64>, predictions: &Array1<f64>) -> RegressionMetrics {
    RegressionMetrics {
        r_squared: r2_score(actuals, predictions),
        mae: mean_absolute_error(actuals, predictions),
        rmse: root_mean_squared_error(actuals, predictions),
    }
}

/// Coefficient of determination. 1.0 is a perfect fit; 0.0 matches
/// predicting the mean. Degenerate constant targets score 0.0.
pub fn r2_score(actuals: &Array1<f64>, predictions: &Array1<f64>) -> f64 {
    assert_eq!(actuals.len(), predictions.len());
    let mean = actuals.mean().unwrap_or(0.0);
    let ss_tot: f64 = actuals.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actuals
        .iter()
        .zip(predictions.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_absolute_error(actuals: &Array1<f64>, predictions: &Array1<f64>) -> f64 {
    assert_eq!(actuals.len(), predictions.len());
    if actuals.is_empty() {
        return 0.0;
    }
    actuals
        .iter()
        .zip(predictions.iter())
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / actuals.len() as f64
}

pub fn root_mean_squared_error(actuals: &Array1<f64>, predictions: &Array1<f64>) -> f64 {
    assert_eq!(actuals.len(), predictions.len());
    if actuals.is_empty() {
        return 0.0;
    }
    (actuals
        .iter()
        .zip(predictions.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / actuals.len() as f64)
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_predictions_score_one() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
        assert_eq!(mean_absolute_error(&y, &y), 0.0);
        assert_eq!(root_mean_squared_error(&y, &y), 0.0);
    }

    #[test]
    fn mean_predictor_scores_zero() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mean = array![2.5, 2.5, 2.5, 2.5];
        assert!(r2_score(&y, &mean).abs() < 1e-12);
    }

    #[test]
    fn constant_targets_score_zero() {
        let y = array![5.0, 5.0, 5.0];
        let p = array![5.0, 5.0, 5.0];
        assert_eq!(r2_score(&y, &p), 0.0);
    }

    #[test]
    fn mae_and_rmse_basics() {
        let y = array![0.0, 0.0];
        let p = array![3.0, -3.0];
        assert!((mean_absolute_error(&y, &p) - 3.0).abs() < 1e-12);
        assert!((root_mean_squared_error(&y, &p) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn aggregate_matches_the_individual_metrics() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let p = array![1.5, 2.0, 2.5, 4.5];
        let m = regression_metrics(&y, &p);
        assert_eq!(m.r_squared, r2_score(&y, &p));
        assert_eq!(m.mae, mean_absolute_error(&y, &p));
        assert_eq!(m.rmse, root_mean_squared_error(&y, &p));
    }
}
