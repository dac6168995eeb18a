//! Error types for feature elimination.
//!
//! `RfeError` covers every failure the library reports. Estimator failures
//! are carried as `Estimator` and passed through the elimination loop
//! untouched.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the elimination pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum RfeError {
    /// A report, plot or feature-set query was made before `fit` completed.
    #[error("This ShapRfeCv instance is not fitted yet. Call 'fit' before using this method.")]
    NotFitted,

    /// Configuration that can never produce a valid run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data that does not satisfy the fit contract.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No elimination round used this number of features.
    #[error("No elimination round used {0} feature(s)")]
    UnknownFeatureCount(usize),

    /// Round index outside the report.
    #[error("Round {0} does not exist in the elimination report")]
    UnknownRound(usize),

    /// The metric is undefined for the given labels/predictions.
    #[error("Scoring failed: {0}")]
    Scoring(String),

    /// Fit, predict or explain failure inside an estimator.
    #[error("Estimator error: {0}")]
    Estimator(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias used across the library.
pub type Result<T, E = RfeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_fitted_display() {
        let err = RfeError::NotFitted;
        assert!(err.to_string().contains("not fitted"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = RfeError::InvalidConfig("min_features_to_select (5) exceeds 3 features".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: min_features_to_select (5) exceeds 3 features"
        );
    }

    #[test]
    fn test_unknown_feature_count_display() {
        assert_eq!(
            RfeError::UnknownFeatureCount(4).to_string(),
            "No elimination round used 4 feature(s)"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: RfeError = io.into();
        assert!(matches!(err, RfeError::Io(_)));
        assert!(err.to_string().contains("missing.csv"));
    }
}
