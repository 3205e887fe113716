pub mod gbdt;
pub mod linear;

use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ParamAssignment;
use crate::error::{ExamPredictionError, Result};

use self::linear::LinearCoefficients;

/// The regressor families evaluated by the selector. `ALL` fixes the
/// evaluation order, which also decides ties (first family wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    LinearRegression,
    ElasticNet,
    DecisionTree,
    GradientBoosting,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::LinearRegression,
        ModelFamily::ElasticNet,
        ModelFamily::DecisionTree,
        ModelFamily::GradientBoosting,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LinearRegression => "Linear Regression",
            ModelFamily::ElasticNet => "Elastic Net",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::GradientBoosting => "Gradient Boosting",
        }
    }

    /// Hyperparameter names this family accepts from a search space.
    pub fn known_params(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::LinearRegression => &[],
            ModelFamily::ElasticNet => &["penalty", "l1_ratio"],
            ModelFamily::DecisionTree => &["max_depth"],
            ModelFamily::GradientBoosting => {
                &["iterations", "max_depth", "shrinkage", "data_sample_ratio"]
            }
        }
    }

    /// Fits this family on the training matrix with the given assignment.
    /// An empty assignment means default hyperparameters (the "vanilla" fit).
    pub fn fit(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: &ParamAssignment,
    ) -> Result<FittedModel> {
        self.reject_unknown_params(params)?;
        match self {
            ModelFamily::LinearRegression => {
                Ok(FittedModel::Linear(linear::fit_linear_regression(x, y)?))
            }
            ModelFamily::ElasticNet => {
                let penalty = param_f64(params, "penalty", 1.0, self.name())?;
                let l1_ratio = param_f64(params, "l1_ratio", 0.5, self.name())?;
                Ok(FittedModel::ElasticNet(linear::fit_elastic_net(
                    x, y, penalty, l1_ratio,
                )?))
            }
            ModelFamily::DecisionTree => {
                let max_depth = param_u32(params, "max_depth", 6, self.name())?;
                Ok(FittedModel::Tree(gbdt::fit_decision_tree(x, y, max_depth)?))
            }
            ModelFamily::GradientBoosting => {
                let settings = gbdt::BoostingSettings {
                    iterations: param_usize(params, "iterations", 100, self.name())?,
                    max_depth: param_u32(params, "max_depth", 6, self.name())?,
                    shrinkage: param_f64(params, "shrinkage", 0.1, self.name())? as f32,
                    data_sample_ratio: param_f64(params, "data_sample_ratio", 1.0, self.name())?,
                };
                Ok(FittedModel::Boosted(gbdt::fit_gradient_boosting(
                    x, y, &settings,
                )?))
            }
        }
    }

    fn reject_unknown_params(&self, params: &ParamAssignment) -> Result<()> {
        for name in params.keys() {
            if !self.known_params().contains(&name.as_str()) {
                return Err(ExamPredictionError::config(format!(
                    "unknown hyperparameter '{}' for model family '{}'",
                    name,
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

/// A fitted regressor, consumed only through `predict`. Serializes as one
/// JSON artifact regardless of family.
#[derive(Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearCoefficients),
    ElasticNet(LinearCoefficients),
    Tree(::gbdt::gradient_boost::GBDT),
    Boosted(::gbdt::gradient_boost::GBDT),
}

// The gbdt estimator does not implement Debug, so print the family tag
// instead of the learned parameters.
impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FittedModel").field(&self.family_name()).finish()
    }
}

impl FittedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            FittedModel::Linear(coefficients) | FittedModel::ElasticNet(coefficients) => {
                coefficients.predict(x)
            }
            FittedModel::Tree(model) | FittedModel::Boosted(model) => gbdt::predict(model, x),
        }
    }

    pub fn family_name(&self) -> &'static str {
        match self {
            FittedModel::Linear(_) => ModelFamily::LinearRegression.name(),
            FittedModel::ElasticNet(_) => ModelFamily::ElasticNet.name(),
            FittedModel::Tree(_) => ModelFamily::DecisionTree.name(),
            FittedModel::Boosted(_) => ModelFamily::GradientBoosting.name(),
        }
    }
}

fn param_f64(params: &ParamAssignment, name: &str, default: f64, family: &str) -> Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            ExamPredictionError::config(format!(
                "hyperparameter '{name}' for '{family}' must be numeric, got {value}"
            ))
        }),
    }
}

fn param_usize(params: &ParamAssignment, name: &str, default: usize, family: &str) -> Result<usize> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.as_usize().ok_or_else(|| {
            ExamPredictionError::config(format!(
                "hyperparameter '{name}' for '{family}' must be a non-negative integer, got {value}"
            ))
        }),
    }
}

fn param_u32(params: &ParamAssignment, name: &str, default: u32, family: &str) -> Result<u32> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.as_u32().ok_or_else(|| {
            ExamPredictionError::config(format!(
                "hyperparameter '{name}' for '{family}' must be a non-negative integer, got {value}"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;
    use ndarray::{Array1, Array2};

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // y = 3x + 1, exactly
        let x = Array2::from_shape_vec((6, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let y = x.column(0).mapv(|v| 3.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn linear_family_recovers_exact_fit() {
        let (x, y) = linear_data();
        let model = ModelFamily::LinearRegression
            .fit(&x, &y, &ParamAssignment::new())
            .unwrap();
        let predictions = model.predict(&x);
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "prediction {p} vs target {t}");
        }
    }

    #[test]
    fn unknown_hyperparameter_is_rejected() {
        let (x, y) = linear_data();
        let mut params = ParamAssignment::new();
        params.insert("learning_rate".into(), ParamValue::Float(0.1));
        let err = ModelFamily::DecisionTree.fit(&x, &y, &params).unwrap_err();
        assert!(err.to_string().contains("learning_rate"));
    }

    #[test]
    fn fitted_model_debug_prints_the_family_tag() {
        let (x, y) = linear_data();
        let linear = ModelFamily::LinearRegression
            .fit(&x, &y, &ParamAssignment::new())
            .unwrap();
        assert_eq!(format!("{linear:?}"), "FittedModel(\"Linear Regression\")");

        let mut params = ParamAssignment::new();
        params.insert("max_depth".into(), ParamValue::Int(3));
        let tree = ModelFamily::DecisionTree.fit(&x, &y, &params).unwrap();
        assert!(format!("{tree:?}").contains("Decision Tree"));
    }

    #[test]
    fn fitted_model_round_trips_through_json() {
        let (x, y) = linear_data();
        let model = ModelFamily::LinearRegression
            .fit(&x, &y, &ParamAssignment::new())
            .unwrap();
        let blob = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&blob).unwrap();
        assert_eq!(model.predict(&x), restored.predict(&x));
        assert_eq!(restored.family_name(), "Linear Regression");
    }
}
