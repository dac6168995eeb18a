//! Single CART decision tree classifier

use std::collections::BTreeMap;

use faer::Mat;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::params::{unknown_param, HyperParams, ParamValue};
use super::shap::ensemble_shap;
use super::tree::{grow_tree, Criterion, MaxFeatures, Tree, TreeParams};
use super::{check_fit_input, check_predict_input, Classifier};
use crate::error::{Result, RfeError};
use crate::pipeline::FeatureMatrix;

/// CART classifier for binary targets
#[derive(Debug, Clone, Default)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    random_state: Option<u64>,
    tree: Option<Tree>,
    n_features: Option<usize>,
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree_params(mut self, params: TreeParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = Some(max_depth);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.params.criterion = criterion;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.params.min_samples_split = min_samples_split;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.params.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.params.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn tree_params(&self) -> &TreeParams {
        &self.params
    }

    /// The fitted tree, if any
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    fn fitted(&self) -> Result<&Tree> {
        self.tree
            .as_ref()
            .ok_or_else(|| RfeError::Estimator(format!("{} is not fitted yet", self.name())))
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &str {
        "DecisionTreeClassifier"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        self.params.validate()?;
        check_fit_input(x, y)?;

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.tree = Some(grow_tree(x, y, (0..x.n_rows()).collect(), &self.params, &mut rng));
        self.n_features = Some(x.n_features());
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        check_predict_input(self.name(), self.n_features, x)?;
        let tree = self.fitted()?;
        Ok((0..x.n_rows()).map(|i| tree.predict_row(&x.row(i))).collect())
    }

    fn shap_values(&self, x: &FeatureMatrix) -> Result<Mat<f64>> {
        check_predict_input(self.name(), self.n_features, x)?;
        let tree = self.fitted()?;
        Ok(ensemble_shap(std::slice::from_ref(tree), x))
    }

    fn expected_value(&self) -> Result<f64> {
        Ok(self.fitted()?.expected_value())
    }
}

impl HyperParams for DecisionTreeClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        if self.params.set(name, value)? {
            return Ok(());
        }
        match name {
            "random_state" => {
                self.random_state = match value {
                    ParamValue::None => None,
                    other => Some(other.as_u64(name)?),
                };
                Ok(())
            }
            _ => Err(unknown_param(self.name(), name)),
        }
    }

    fn params(&self) -> BTreeMap<String, ParamValue> {
        let mut params = BTreeMap::new();
        self.params.insert_into(&mut params);
        params.insert(
            "random_state".into(),
            self.random_state.map(|s| s as i64).into(),
        );
        params
    }
}
