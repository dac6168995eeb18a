//! Exact path-dependent TreeSHAP.
//!
//! Implements the polynomial-time algorithm from Lundberg et al. (2020),
//! "From local explanations to global understanding with explainable AI for
//! trees". Branches a sample does not follow are weighted by node covers, so
//! for every row `sum(phi) + expected_value == prediction`.

use faer::Mat;
use rayon::prelude::*;

use super::tree::Tree;
use crate::pipeline::FeatureMatrix;

/// One element of the unique feature path
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` marks the root sentinel
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Grow the path by one feature, updating the permutation weights
fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension that introduced `path[path_index]`
fn unwind_path(path: &mut Vec<PathElement>, path_index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in path_index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with `path[path_index]` removed
fn unwound_path_sum(path: &[PathElement], path_index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((depth - i) as f64 / denom);
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((depth - i) as f64 / denom);
        }
    }

    total
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    phi: &mut [f64],
    node_idx: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    let node = tree.node(node_idx);
    let Some(split_feature) = node.feature else {
        for i in 1..path.len() {
            let weight = unwound_path_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                phi[f] += weight * (el.one_fraction - el.zero_fraction) * node.value;
            }
        }
        return;
    };

    let hot = tree.next_node(node_idx, x);
    let cold = if hot == node.left { node.right } else { node.left };
    let hot_zero_fraction = tree.node(hot).cover / node.cover;
    let cold_zero_fraction = tree.node(cold).cover / node.cover;

    let mut incoming_zero_fraction = 1.0;
    let mut incoming_one_fraction = 1.0;

    // A feature already on the path is undone and re-applied at this node
    if let Some(path_index) = path.iter().position(|el| el.feature == Some(split_feature)) {
        incoming_zero_fraction = path[path_index].zero_fraction;
        incoming_one_fraction = path[path_index].one_fraction;
        unwind_path(&mut path, path_index);
    }

    if hot_zero_fraction * incoming_zero_fraction > 0.0 || incoming_one_fraction > 0.0 {
        recurse(
            tree,
            x,
            phi,
            hot,
            &path,
            hot_zero_fraction * incoming_zero_fraction,
            incoming_one_fraction,
            Some(split_feature),
        );
    }
    if cold_zero_fraction * incoming_zero_fraction > 0.0 {
        recurse(
            tree,
            x,
            phi,
            cold,
            &path,
            cold_zero_fraction * incoming_zero_fraction,
            0.0,
            Some(split_feature),
        );
    }
}

/// Add the SHAP values of one tree for one sample into `phi`
pub fn tree_shap_row(tree: &Tree, x: &[f64], phi: &mut [f64]) {
    recurse(tree, x, phi, 0, &[], 1.0, 1.0, None);
}

/// SHAP values of an averaged ensemble, shaped `rows × features`
pub fn ensemble_shap(trees: &[Tree], x: &FeatureMatrix) -> Mat<f64> {
    let n_features = x.n_features();
    let scale = if trees.is_empty() { 0.0 } else { 1.0 / trees.len() as f64 };

    let rows: Vec<Vec<f64>> = (0..x.n_rows())
        .into_par_iter()
        .map(|i| {
            let sample = x.row(i);
            let mut phi = vec![0.0; n_features];
            for tree in trees {
                tree_shap_row(tree, &sample, &mut phi);
            }
            phi.iter_mut().for_each(|v| *v *= scale);
            phi
        })
        .collect();

    Mat::from_fn(x.n_rows(), n_features, |i, j| rows[i][j])
}
