//! Binary classification tree storage and CART growth
//!
//! Nodes are stored in a flat vector with the root at index 0. Every node
//! keeps its cover (number of training samples reaching it), which TreeSHAP
//! needs to weight the branches a sample does not take.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::Serialize;

use super::params::ParamValue;
use crate::error::{Result, RfeError};
use crate::pipeline::FeatureMatrix;

/// Minimum gap between two values for a threshold to be placed between them
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Impurities below this are treated as pure
const PURITY_EPSILON: f64 = 1e-12;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    /// Impurity of a node holding `positives` class-1 samples out of `total`
    pub fn impurity(&self, positives: f64, total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        let p = positives / total;
        match self {
            Criterion::Gini => 2.0 * p * (1.0 - p),
            Criterion::Entropy => {
                let h = |q: f64| if q > 0.0 { -q * q.log2() } else { 0.0 };
                h(p) + h(1.0 - p)
            }
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => write!(f, "gini"),
            Criterion::Entropy => write!(f, "entropy"),
        }
    }
}

impl FromStr for Criterion {
    type Err = RfeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            _ => Err(RfeError::InvalidConfig(format!(
                "Unknown criterion '{}'. Valid options: gini, entropy",
                s
            ))),
        }
    }
}

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum MaxFeatures {
    #[default]
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against the number of available features (always at least 1)
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Count(k) => *k,
            MaxFeatures::Fraction(f) => (f * n_features as f64) as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => write!(f, "all"),
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Log2 => write!(f, "log2"),
            MaxFeatures::Count(k) => write!(f, "{}", k),
            MaxFeatures::Fraction(x) => write!(f, "{}", x),
        }
    }
}

impl FromStr for MaxFeatures {
    type Err = RfeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" | "none" => Ok(MaxFeatures::All),
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            other => {
                if let Ok(k) = other.parse::<usize>() {
                    if k == 0 {
                        return Err(RfeError::InvalidConfig("max_features must be >= 1".into()));
                    }
                    Ok(MaxFeatures::Count(k))
                } else if let Ok(x) = other.parse::<f64>() {
                    if !(x > 0.0 && x <= 1.0) {
                        return Err(RfeError::InvalidConfig(format!(
                            "max_features fraction must be in (0, 1], got {}",
                            x
                        )));
                    }
                    Ok(MaxFeatures::Fraction(x))
                } else {
                    Err(RfeError::InvalidConfig(format!(
                        "Unknown max_features '{}'. Valid options: all, sqrt, log2, <count>, <fraction>",
                        s
                    )))
                }
            }
        }
    }
}

/// Growth limits shared by single trees and forests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeParams {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(RfeError::InvalidConfig(format!(
                "min_samples_split must be an integer greater than 1, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(RfeError::InvalidConfig(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(RfeError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    /// Apply a growth parameter by name. Returns `false` for names it does not own.
    ///
    /// Values are not range-checked here; `validate` runs at fit time.
    pub(crate) fn set(&mut self, name: &str, value: &ParamValue) -> Result<bool> {
        match name {
            "criterion" => self.criterion = value.to_string().parse()?,
            "max_depth" => self.max_depth = value.as_optional_usize(name)?,
            "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "max_features" => self.max_features = value.to_string().parse()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn insert_into(&self, params: &mut BTreeMap<String, ParamValue>) {
        params.insert("criterion".into(), ParamValue::Str(self.criterion.to_string()));
        params.insert(
            "max_depth".into(),
            self.max_depth.map(|d| d as i64).into(),
        );
        params.insert(
            "min_samples_split".into(),
            ParamValue::Int(self.min_samples_split as i64),
        );
        params.insert(
            "min_samples_leaf".into(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
        params.insert(
            "max_features".into(),
            ParamValue::Str(self.max_features.to_string()),
        );
    }
}

/// A tree node; leaves have `feature == None`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub feature: Option<usize>,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
    /// Direction taken by missing values
    pub default_left: bool,
    /// Fraction of class-1 samples in the node
    pub value: f64,
    pub cover: f64,
    pub impurity: f64,
}

impl Node {
    fn leaf(value: f64, cover: f64, impurity: f64) -> Self {
        Self {
            feature: None,
            threshold: f64::NAN,
            left: 0,
            right: 0,
            default_left: true,
            value,
            cover,
            impurity,
        }
    }
}

/// A fitted binary classification tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree from raw nodes. Children must point inside the vector.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(RfeError::Estimator("A tree needs at least one node".into()));
        }
        for (idx, node) in nodes.iter().enumerate() {
            if node.feature.is_some() && (node.left >= nodes.len() || node.right >= nodes.len()) {
                return Err(RfeError::Estimator(format!(
                    "Node {} points outside the tree",
                    idx
                )));
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    #[inline]
    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].feature.is_none()
    }

    /// Child reached from an internal node for the given sample
    #[inline]
    pub fn next_node(&self, idx: usize, x: &[f64]) -> usize {
        let node = &self.nodes[idx];
        let feature = node.feature.unwrap_or(0);
        let value = x[feature];
        let go_left = if value.is_nan() {
            node.default_left
        } else {
            value <= node.threshold
        };
        if go_left {
            node.left
        } else {
            node.right
        }
    }

    /// Class-1 probability for one sample
    pub fn predict_row(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        while !self.is_leaf(idx) {
            idx = self.next_node(idx, x);
        }
        self.nodes[idx].value
    }

    /// Cover-weighted mean of the leaf values
    pub fn expected_value(&self) -> f64 {
        let (weighted, total) = self
            .nodes
            .iter()
            .filter(|n| n.feature.is_none())
            .fold((0.0, 0.0), |(w, t), n| (w + n.value * n.cover, t + n.cover));
        if total > 0.0 {
            weighted / total
        } else {
            self.nodes[0].value
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_from(tree: &Tree, idx: usize) -> usize {
            if tree.is_leaf(idx) {
                0
            } else {
                let node = tree.node(idx);
                1 + depth_from(tree, node.left).max(depth_from(tree, node.right))
            }
        }
        depth_from(self, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.feature.is_none()).count()
    }

    /// Features used by at least one split
    pub fn split_features(&self) -> Vec<usize> {
        let mut features: Vec<usize> = self.nodes.iter().filter_map(|n| n.feature).collect();
        features.sort_unstable();
        features.dedup();
        features
    }
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

/// Grow a CART tree on the given samples.
///
/// `samples` may contain repeated indices (bootstrap draws); repeats count
/// towards node covers. `rng` drives feature subsampling when
/// `max_features` is below the feature count.
pub fn grow_tree(
    x: &FeatureMatrix,
    y: &[u8],
    samples: Vec<usize>,
    params: &TreeParams,
    rng: &mut StdRng,
) -> Tree {
    let mut nodes = Vec::new();
    grow_node(x, y, samples, 0, params, rng, &mut nodes);
    Tree { nodes }
}

fn grow_node(
    x: &FeatureMatrix,
    y: &[u8],
    samples: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
) -> usize {
    let n = samples.len() as f64;
    let positives = samples.iter().filter(|&&i| y[i] == 1).count() as f64;
    let value = if n > 0.0 { positives / n } else { 0.0 };
    let impurity = params.criterion.impurity(positives, n);

    let idx = nodes.len();
    nodes.push(Node::leaf(value, n, impurity));

    let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
    if depth_reached
        || samples.len() < params.min_samples_split
        || samples.len() < 2 * params.min_samples_leaf
        || impurity <= PURITY_EPSILON
    {
        return idx;
    }

    let Some(split) = find_best_split(x, y, &samples, positives, impurity, params, rng) else {
        return idx;
    };

    let (left_samples, right_samples): (Vec<usize>, Vec<usize>) =
        samples.into_iter().partition(|&i| {
            let v = x.get(i, split.feature);
            if v.is_nan() {
                split.default_left
            } else {
                v <= split.threshold
            }
        });

    let left = grow_node(x, y, left_samples, depth + 1, params, rng, nodes);
    let right = grow_node(x, y, right_samples, depth + 1, params, rng, nodes);

    let node = &mut nodes[idx];
    node.feature = Some(split.feature);
    node.threshold = split.threshold;
    node.default_left = split.default_left;
    node.left = left;
    node.right = right;

    idx
}

fn candidate_features(n_features: usize, params: &TreeParams, rng: &mut StdRng) -> Vec<usize> {
    let k = params.max_features.resolve(n_features);
    if k >= n_features {
        (0..n_features).collect()
    } else {
        sample(rng, n_features, k).into_vec()
    }
}

fn find_best_split(
    x: &FeatureMatrix,
    y: &[u8],
    samples: &[usize],
    positives: f64,
    parent_impurity: f64,
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n_total = samples.len() as f64;
    let min_leaf = params.min_samples_leaf as f64;
    let mut best: Option<SplitCandidate> = None;

    for feature in candidate_features(x.n_features(), params, rng) {
        let mut present: Vec<(f64, u8)> = Vec::with_capacity(samples.len());
        let mut missing_n = 0.0;
        let mut missing_pos = 0.0;

        for &i in samples {
            let v = x.get(i, feature);
            if v.is_nan() {
                missing_n += 1.0;
                missing_pos += f64::from(y[i]);
            } else {
                present.push((v, y[i]));
            }
        }

        if present.len() < 2 {
            continue;
        }
        present.sort_by(|a, b| a.0.total_cmp(&b.0));

        let present_pos = positives - missing_pos;
        let present_n = present.len() as f64;
        let directions: &[bool] = if missing_n > 0.0 { &[true, false] } else { &[true] };

        let mut left_n = 0.0;
        let mut left_pos = 0.0;

        for i in 0..present.len() - 1 {
            left_n += 1.0;
            left_pos += f64::from(present[i].1);

            if present[i + 1].0 <= present[i].0 + FEATURE_THRESHOLD {
                continue;
            }

            for &missing_left in directions {
                let (ln, lp) = if missing_left {
                    (left_n + missing_n, left_pos + missing_pos)
                } else {
                    (left_n, left_pos)
                };
                let (rn, rp) = if missing_left {
                    (present_n - left_n, present_pos - left_pos)
                } else {
                    (present_n - left_n + missing_n, present_pos - left_pos + missing_pos)
                };

                if ln < min_leaf || rn < min_leaf {
                    continue;
                }

                let child_impurity = (ln / n_total) * params.criterion.impurity(lp, ln)
                    + (rn / n_total) * params.criterion.impurity(rp, rn);
                let gain = parent_impurity - child_impurity;

                if best.map_or(true, |b| gain > b.gain + PURITY_EPSILON) {
                    let mut threshold = (present[i].0 + present[i + 1].0) / 2.0;
                    if threshold >= present[i + 1].0 {
                        threshold = present[i].0;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        default_left: missing_left,
                        gain,
                    });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn stump() -> Tree {
        Tree::from_nodes(vec![
            Node {
                feature: Some(0),
                threshold: 0.5,
                left: 1,
                right: 2,
                default_left: true,
                value: 0.5,
                cover: 8.0,
                impurity: 0.5,
            },
            Node::leaf(0.0, 4.0, 0.0),
            Node::leaf(1.0, 4.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_gini_impurity() {
        let gini = Criterion::Gini;
        assert_eq!(gini.impurity(0.0, 10.0), 0.0);
        assert!((gini.impurity(5.0, 10.0) - 0.5).abs() < 1e-12);
        assert_eq!(gini.impurity(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_entropy_impurity() {
        let entropy = Criterion::Entropy;
        assert!((entropy.impurity(5.0, 10.0) - 1.0).abs() < 1e-12);
        assert_eq!(entropy.impurity(10.0, 10.0), 0.0);
    }

    #[test]
    fn test_criterion_from_str() {
        assert_eq!("GINI".parse::<Criterion>().unwrap(), Criterion::Gini);
        assert_eq!("entropy".parse::<Criterion>().unwrap(), Criterion::Entropy);
        assert!("log_loss".parse::<Criterion>().is_err());
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::All.resolve(9), 9);
        assert_eq!(MaxFeatures::Sqrt.resolve(9), 3);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::Count(20).resolve(5), 5);
        assert_eq!(MaxFeatures::Fraction(0.1).resolve(5), 1);
        assert_eq!("sqrt".parse::<MaxFeatures>().unwrap(), MaxFeatures::Sqrt);
        assert_eq!("0.5".parse::<MaxFeatures>().unwrap(), MaxFeatures::Fraction(0.5));
        assert!("0".parse::<MaxFeatures>().is_err());
    }

    #[test]
    fn test_predict_and_expected_value() {
        let tree = stump();
        assert_eq!(tree.predict_row(&[0.2]), 0.0);
        assert_eq!(tree.predict_row(&[0.9]), 1.0);
        assert_eq!(tree.predict_row(&[f64::NAN]), 0.0);
        assert!((tree.expected_value() - 0.5).abs() < 1e-12);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_from_nodes_rejects_dangling_children() {
        let result = Tree::from_nodes(vec![Node {
            feature: Some(0),
            threshold: 0.0,
            left: 1,
            right: 2,
            default_left: true,
            value: 0.5,
            cover: 2.0,
            impurity: 0.5,
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_grow_tree_picks_separating_feature() {
        let x = FeatureMatrix::from_rows(
            &["noise", "signal"],
            &[
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
                vec![1.0, 1.0],
            ],
        )
        .unwrap();
        let y = [0, 1, 0, 1];
        let params = TreeParams {
            max_depth: Some(1),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);

        let tree = grow_tree(&x, &y, (0..4).collect(), &params, &mut rng);
        assert_eq!(tree.split_features(), vec![1]);
        assert_eq!(tree.predict_row(&[1.0, 1.0]), 1.0);
        assert_eq!(tree.predict_row(&[1.0, 0.0]), 0.0);
        assert_eq!(tree.node(0).cover, 4.0);
    }

    #[test]
    fn test_grow_tree_respects_min_samples_leaf() {
        let x = FeatureMatrix::from_rows(
            &["a"],
            &[vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
        )
        .unwrap();
        let y = [1, 0, 0, 0];
        let params = TreeParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);

        let tree = grow_tree(&x, &y, (0..4).collect(), &params, &mut rng);
        for node in tree.nodes().iter().filter(|n| n.feature.is_none()) {
            assert!(node.cover >= 2.0);
        }
    }

    #[test]
    fn test_grow_tree_routes_missing_values() {
        let x = FeatureMatrix::from_rows(
            &["a"],
            &[vec![0.0], vec![f64::NAN], vec![5.0], vec![6.0]],
        )
        .unwrap();
        let y = [0, 1, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);

        let tree = grow_tree(&x, &y, (0..4).collect(), &TreeParams::default(), &mut rng);
        assert_eq!(tree.predict_row(&[f64::NAN]), 1.0);
        assert_eq!(tree.predict_row(&[0.0]), 0.0);
    }

    #[test]
    fn test_params_validation() {
        let params = TreeParams {
            min_samples_split: 1,
            ..Default::default()
        };
        assert!(params.validate().unwrap_err().to_string().contains("greater than 1"));
        assert!(TreeParams::default().validate().is_ok());
    }
}
