//! ShapRFE: recursive feature elimination library
//!
//! Repeatedly trains a tree classifier on cross-validation folds, ranks
//! features by mean absolute SHAP value and drops the least important ones,
//! recording train and validation scores for every round.

pub mod cli;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{Result, RfeError};
pub use model::{Classifier, DecisionTreeClassifier, RandomForestClassifier};
pub use pipeline::{FeatureMatrix, RandomizedSearchCv, Scorer, ShapRfeCv, Step};
pub use report::{EliminationReport, PlotHandle};
