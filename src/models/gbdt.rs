use gbdt::config::Config as GbdtConfig;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::{ExamPredictionError, Result};

/// Knobs for the boosted family that the search space may override.
#[derive(Debug, Clone)]
pub struct BoostingSettings {
    pub iterations: usize,
    pub max_depth: u32,
    pub shrinkage: f32,
    pub data_sample_ratio: f64,
}

impl Default for BoostingSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 6,
            shrinkage: 0.1,
            data_sample_ratio: 1.0,
        }
    }
}

fn base_config(feature_size: usize) -> GbdtConfig {
    let mut config = GbdtConfig::new();
    config.set_feature_size(feature_size);
    config.set_loss("SquaredError");
    config.set_debug(false);
    config.set_feature_sample_ratio(1.0);
    config.set_training_optimization_level(2);
    config
}

/// A single regression tree: one boosting iteration with no shrinkage.
pub fn fit_decision_tree(x: &Array2<f64>, y: &Array1<f64>, max_depth: u32) -> Result<GBDT> {
    let mut config = base_config(x.ncols());
    config.set_iterations(1);
    config.set_shrinkage(1.0);
    config.set_max_depth(max_depth);
    config.set_data_sample_ratio(1.0);
    fit(config, x, y, "Decision Tree")
}

pub fn fit_gradient_boosting(
    x: &Array2<f64>,
    y: &Array1<f64>,
    settings: &BoostingSettings,
) -> Result<GBDT> {
    let mut config = base_config(x.ncols());
    config.set_iterations(settings.iterations);
    config.set_shrinkage(settings.shrinkage);
    config.set_max_depth(settings.max_depth);
    config.set_data_sample_ratio(settings.data_sample_ratio);
    fit(config, x, y, "Gradient Boosting")
}

fn fit(config: GbdtConfig, x: &Array2<f64>, y: &Array1<f64>, family: &str) -> Result<GBDT> {
    if x.nrows() == 0 || x.nrows() != y.len() {
        return Err(ExamPredictionError::training(
            family,
            format!("feature/target shape mismatch: {} rows vs {} targets", x.nrows(), y.len()),
        ));
    }
    let mut train_data = training_datavec(x, y);
    let mut model = GBDT::new(&config);
    model.fit(&mut train_data);
    debug!(family, rows = x.nrows(), features = x.ncols(), "tree model fitted");
    Ok(model)
}

pub fn predict(model: &GBDT, x: &Array2<f64>) -> Array1<f64> {
    let test_data = test_datavec(x);
    let predictions = model.predict(&test_data);
    Array1::from_iter(predictions.into_iter().map(|p| p as f64))
}

fn training_datavec(x: &Array2<f64>, y: &Array1<f64>) -> DataVec {
    let mut data_vec = DataVec::with_capacity(x.nrows());
    for (row, target) in x.outer_iter().zip(y.iter()) {
        let feature: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        data_vec.push(Data::new_training_data(feature, 1.0, *target as f32, None));
    }
    data_vec
}

fn test_datavec(x: &Array2<f64>) -> DataVec {
    let mut data_vec = DataVec::with_capacity(x.nrows());
    for row in x.outer_iter() {
        let feature: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        data_vec.push(Data::new_test_data(feature, None));
    }
    data_vec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        // a step function a single tree can represent exactly
        let n = 40;
        let mut x = Array2::zeros((n, 1));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            x[[i, 0]] = i as f64;
            y[i] = if i < n / 2 { 10.0 } else { 50.0 };
        }
        (x, y)
    }

    #[test]
    fn single_tree_learns_a_step() {
        let (x, y) = step_data();
        let model = fit_decision_tree(&x, &y, 3).unwrap();
        let predictions = predict(&model, &x);
        assert!((predictions[0] - 10.0).abs() < 1.0);
        assert!((predictions[39] - 50.0).abs() < 1.0);
    }

    #[test]
    fn boosting_outperforms_a_shallow_tree_on_a_ramp() {
        // a linear ramp is a bad fit for 4 leaves but easy for an ensemble
        let n = 40;
        let mut x = Array2::zeros((n, 1));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            x[[i, 0]] = i as f64;
            y[i] = i as f64;
        }
        let tree = fit_decision_tree(&x, &y, 2).unwrap();
        let boosted = fit_gradient_boosting(&x, &y, &BoostingSettings::default()).unwrap();
        let err = |p: Array1<f64>| -> f64 {
            p.iter().zip(y.iter()).map(|(a, b)| (a - b).powi(2)).sum()
        };
        assert!(err(predict(&boosted, &x)) < err(predict(&tree, &x)));
    }

    #[test]
    fn shape_mismatch_is_a_training_error() {
        let x = Array2::zeros((3, 2));
        let y = Array1::zeros(4);
        assert!(fit_decision_tree(&x, &y, 3).is_err());
    }
}
