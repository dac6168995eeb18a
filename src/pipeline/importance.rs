//! Feature ranking by mean absolute SHAP value

use faer::Mat;
use serde::Serialize;

use crate::error::{Result, RfeError};

/// Mean |SHAP| of one feature over all validation rows of a round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean_abs_shap: f64,
}

/// Rank features by mean |SHAP| over the stacked rows of several matrices.
///
/// The sort is stable and descending: features with equal importance keep
/// their column order, so the least important feature is always last.
pub fn shap_importance(shap_blocks: &[Mat<f64>], features: &[String]) -> Result<Vec<FeatureImportance>> {
    let n_features = features.len();
    let mut totals = vec![0.0; n_features];
    let mut n_rows = 0usize;

    for block in shap_blocks {
        if block.ncols() != n_features {
            return Err(RfeError::Estimator(format!(
                "SHAP matrix has {} columns but {} features are in play",
                block.ncols(),
                n_features
            )));
        }
        for j in 0..n_features {
            for i in 0..block.nrows() {
                totals[j] += block[(i, j)].abs();
            }
        }
        n_rows += block.nrows();
    }

    let denom = n_rows.max(1) as f64;
    let mut ranking: Vec<FeatureImportance> = features
        .iter()
        .zip(totals)
        .map(|(feature, total)| FeatureImportance {
            feature: feature.clone(),
            mean_abs_shap: total / denom,
        })
        .collect();
    ranking.sort_by(|a, b| b.mean_abs_shap.total_cmp(&a.mean_abs_shap));

    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ranking_uses_absolute_values() {
        let a = Mat::from_fn(2, 3, |i, j| match (i, j) {
            (0, 0) => -0.4,
            (1, 0) => 0.2,
            (_, 2) => 0.1,
            _ => 0.0,
        });
        let ranking = shap_importance(&[a], &names(&["a", "b", "c"])).unwrap();

        let order: Vec<&str> = ranking.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
        assert!((ranking[0].mean_abs_shap - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_column_order() {
        let a = Mat::from_fn(1, 3, |_, j| if j == 2 { 1.0 } else { 0.0 });
        let ranking = shap_importance(&[a], &names(&["col_1", "col_2", "col_3"])).unwrap();
        let order: Vec<&str> = ranking.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["col_3", "col_1", "col_2"]);
    }

    #[test]
    fn test_blocks_are_stacked() {
        let a = Mat::from_fn(1, 1, |_, _| 1.0);
        let b = Mat::from_fn(3, 1, |_, _| 0.0);
        let ranking = shap_importance(&[a, b], &names(&["x"])).unwrap();
        assert!((ranking[0].mean_abs_shap - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_column_mismatch_is_error() {
        let a = Mat::from_fn(1, 2, |_, _| 1.0);
        assert!(shap_importance(&[a], &names(&["x"])).is_err());
    }
}
