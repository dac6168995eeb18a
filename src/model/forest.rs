//! Bagged random forest of CART trees

use std::collections::BTreeMap;

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::params::{unknown_param, HyperParams, ParamValue};
use super::shap::ensemble_shap;
use super::tree::{grow_tree, MaxFeatures, Tree, TreeParams};
use super::{check_fit_input, check_predict_input, Classifier};
use crate::error::{Result, RfeError};
use crate::pipeline::FeatureMatrix;

/// Random forest classifier; probabilities and SHAP values are tree averages
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    n_estimators: usize,
    bootstrap: bool,
    params: TreeParams,
    random_state: Option<u64>,
    trees: Vec<Tree>,
    n_features: Option<usize>,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            bootstrap: true,
            params: TreeParams {
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            random_state: None,
            trees: Vec::new(),
            n_features: None,
        }
    }
}

impl RandomForestClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_tree_params(mut self, params: TreeParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = Some(max_depth);
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

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    fn fitted_trees(&self) -> Result<&[Tree]> {
        if self.trees.is_empty() {
            return Err(RfeError::Estimator(format!("{} is not fitted yet", self.name())));
        }
        Ok(&self.trees)
    }
}

impl Classifier for RandomForestClassifier {
    fn name(&self) -> &str {
        "RandomForestClassifier"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(RfeError::InvalidConfig("n_estimators must be at least 1".into()));
        }
        self.params.validate()?;
        check_fit_input(x, y)?;

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // Per-tree seeds are drawn up front so parallel training stays reproducible
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();

        let n_rows = x.n_rows();
        let bootstrap = self.bootstrap;
        let params = &self.params;

        self.trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut tree_rng = StdRng::seed_from_u64(seed);
                let samples: Vec<usize> = if bootstrap {
                    (0..n_rows).map(|_| tree_rng.gen_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                grow_tree(x, y, samples, params, &mut tree_rng)
            })
            .collect();
        self.n_features = Some(x.n_features());
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        check_predict_input(self.name(), self.n_features, x)?;
        let trees = self.fitted_trees()?;
        let scale = 1.0 / trees.len() as f64;

        Ok((0..x.n_rows())
            .map(|i| {
                let row = x.row(i);
                trees.iter().map(|t| t.predict_row(&row)).sum::<f64>() * scale
            })
            .collect())
    }

    fn shap_values(&self, x: &FeatureMatrix) -> Result<Mat<f64>> {
        check_predict_input(self.name(), self.n_features, x)?;
        Ok(ensemble_shap(self.fitted_trees()?, x))
    }

    fn expected_value(&self) -> Result<f64> {
        let trees = self.fitted_trees()?;
        Ok(trees.iter().map(Tree::expected_value).sum::<f64>() / trees.len() as f64)
    }
}

impl HyperParams for RandomForestClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        if self.params.set(name, value)? {
            return Ok(());
        }
        match name {
            "n_estimators" => self.n_estimators = value.as_usize(name)?,
            "bootstrap" => match value {
                ParamValue::Bool(b) => self.bootstrap = *b,
                other => {
                    return Err(RfeError::InvalidConfig(format!(
                        "Parameter 'bootstrap' expects true or false, got {}",
                        other
                    )))
                }
            },
            "random_state" => {
                self.random_state = match value {
                    ParamValue::None => None,
                    other => Some(other.as_u64(name)?),
                }
            }
            _ => return Err(unknown_param(self.name(), name)),
        }
        Ok(())
    }

    fn params(&self) -> BTreeMap<String, ParamValue> {
        let mut params = BTreeMap::new();
        self.params.insert_into(&mut params);
        params.insert("n_estimators".into(), ParamValue::Int(self.n_estimators as i64));
        params.insert("bootstrap".into(), ParamValue::Bool(self.bootstrap));
        params.insert(
            "random_state".into(),
            self.random_state.map(|s| s as i64).into(),
        );
        params
    }
}
