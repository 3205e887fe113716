use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExamPredictionError, Result};

/// Fitted parameters of a linear-family model, extracted from the linfa
/// estimator so the artifact is a plain weights-plus-intercept struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearCoefficients {
    pub weights: Array1<f64>,
    pub intercept: f64,
}

impl LinearCoefficients {
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.intercept
    }
}

/// Ordinary least squares via linfa's pure-Rust solver.
pub fn fit_linear_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<LinearCoefficients> {
    let dataset = Dataset::new(x.clone(), y.clone());
    let model = LinearRegression::new().fit(&dataset).map_err(|e| {
        ExamPredictionError::training("Linear Regression", e.to_string())
    })?;
    debug!(intercept = model.intercept(), "linear regression fitted");
    Ok(LinearCoefficients {
        weights: model.params().to_owned(),
        intercept: model.intercept(),
    })
}

/// Coordinate-descent elastic net. `penalty` is the regularization strength,
/// `l1_ratio` in [0, 1] blends lasso (1) and ridge (0).
pub fn fit_elastic_net(
    x: &Array2<f64>,
    y: &Array1<f64>,
    penalty: f64,
    l1_ratio: f64,
) -> Result<LinearCoefficients> {
    let dataset = Dataset::new(x.clone(), y.clone());
    let model = ElasticNet::params()
        .penalty(penalty)
        .l1_ratio(l1_ratio)
        .fit(&dataset)
        .map_err(|e| ExamPredictionError::training("Elastic Net", e.to_string()))?;
    debug!(penalty, l1_ratio, intercept = model.intercept(), "elastic net fitted");
    Ok(LinearCoefficients {
        weights: model.hyperplane().to_owned(),
        intercept: model.intercept(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn two_feature_data() -> (Array2<f64>, Array1<f64>) {
        // y = 2a - b + 5
        let n = 20;
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let a = i as f64;
            let b = (i * i % 7) as f64;
            x[[i, 0]] = a;
            x[[i, 1]] = b;
            y[i] = 2.0 * a - b + 5.0;
        }
        (x, y)
    }

    #[test]
    fn least_squares_recovers_coefficients() {
        let (x, y) = two_feature_data();
        let fitted = fit_linear_regression(&x, &y).unwrap();
        assert!((fitted.weights[0] - 2.0).abs() < 1e-6);
        assert!((fitted.weights[1] + 1.0).abs() < 1e-6);
        assert!((fitted.intercept - 5.0).abs() < 1e-6);
    }

    #[test]
    fn elastic_net_shrinks_towards_small_weights() {
        let (x, y) = two_feature_data();
        let light = fit_elastic_net(&x, &y, 0.01, 0.5).unwrap();
        let heavy = fit_elastic_net(&x, &y, 100.0, 0.5).unwrap();
        let light_norm: f64 = light.weights.iter().map(|w| w.abs()).sum();
        let heavy_norm: f64 = heavy.weights.iter().map(|w| w.abs()).sum();
        assert!(heavy_norm < light_norm);
    }

    #[test]
    fn predict_applies_weights_and_intercept() {
        let coefficients = LinearCoefficients {
            weights: Array::from_vec(vec![1.5, -0.5]),
            intercept: 2.0,
        };
        let x = Array2::from_shape_vec((1, 2), vec![4.0, 2.0]).unwrap();
        let out = coefficients.predict(&x);
        assert!((out[0] - 7.0).abs() < 1e-12);
    }
}
