pub mod artifacts;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod feature_engineering;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod predict;
pub mod preprocessing;
pub mod training;
pub mod tuning;

pub use config::Config;
pub use data_loader::DataLoader;
pub use error::{ExamPredictionError, Result};
pub use feature_engineering::FeatureAugmenter;
pub use models::{FittedModel, ModelFamily};
pub use predict::{PredictPipeline, StudentRecord};
pub use preprocessing::{FittedPreprocessor, Preprocessor};
