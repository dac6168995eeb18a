//! Model module - tree classifiers, TreeSHAP and hyperparameters

pub mod decision_tree;
pub mod forest;
pub mod params;
pub mod shap;
pub mod tree;

pub use decision_tree::DecisionTreeClassifier;
pub use forest::RandomForestClassifier;
pub use params::{HyperParams, ParamGrid, ParamValue};
pub use tree::{Criterion, MaxFeatures, Tree, TreeParams};

use faer::Mat;

use crate::error::{Result, RfeError};
use crate::pipeline::FeatureMatrix;

/// A binary classifier that can explain its predictions with SHAP values.
///
/// Estimators are cloned once per fold, so `Clone` must produce an
/// independent (unfitted or fitted) copy.
pub trait Classifier: Clone + Send + Sync {
    fn name(&self) -> &str;

    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()>;

    fn is_fitted(&self) -> bool;

    /// Number of features seen during fit
    fn n_features(&self) -> Option<usize>;

    /// Probability of class 1 for each row
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }

    /// SHAP values in probability space, shaped `rows × features`
    fn shap_values(&self, x: &FeatureMatrix) -> Result<Mat<f64>>;

    /// Baseline the SHAP values of a row add up from
    fn expected_value(&self) -> Result<f64>;
}

/// Validate training data before fitting
pub fn check_fit_input(x: &FeatureMatrix, y: &[u8]) -> Result<()> {
    if x.n_rows() == 0 {
        return Err(RfeError::InvalidInput("Cannot fit on an empty dataset".into()));
    }
    if x.n_features() == 0 {
        return Err(RfeError::InvalidInput("Cannot fit without features".into()));
    }
    if x.n_rows() != y.len() {
        return Err(RfeError::InvalidInput(format!(
            "Feature matrix has {} rows but {} labels were given",
            x.n_rows(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(RfeError::InvalidInput(format!(
            "Labels must be 0 or 1, found {}",
            bad
        )));
    }
    Ok(())
}

/// Ensure a fitted estimator is queried with the feature count it was trained on
pub(crate) fn check_predict_input(
    estimator: &str,
    fitted_features: Option<usize>,
    x: &FeatureMatrix,
) -> Result<()> {
    let expected = fitted_features.ok_or_else(|| {
        RfeError::Estimator(format!("{} is not fitted yet", estimator))
    })?;
    if x.n_features() != expected {
        return Err(RfeError::InvalidInput(format!(
            "{} was fitted with {} features but got {}",
            estimator,
            expected,
            x.n_features()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fit_input() {
        let x = FeatureMatrix::from_rows(&["a"], &[vec![1.0], vec![2.0]]).unwrap();
        assert!(check_fit_input(&x, &[0, 1]).is_ok());
        assert!(check_fit_input(&x, &[0]).is_err());
        assert!(check_fit_input(&x, &[0, 2]).is_err());
    }

    #[test]
    fn test_check_predict_input() {
        let x = FeatureMatrix::from_rows(&["a", "b"], &[vec![1.0, 0.0]]).unwrap();
        assert!(check_predict_input("tree", None, &x).is_err());
        assert!(check_predict_input("tree", Some(3), &x).is_err());
        assert!(check_predict_input("tree", Some(2), &x).is_ok());
    }
}
