//! Binary classification scorers. Higher is always better.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, RfeError};
use crate::model::Classifier;
use crate::pipeline::FeatureMatrix;

/// Probabilities are clipped to `[EPS, 1 - EPS]` for log loss
const LOG_LOSS_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    #[default]
    RocAuc,
    Accuracy,
    BalancedAccuracy,
    Precision,
    Recall,
    F1,
    NegLogLoss,
}

impl Scorer {
    pub const ALL: [Scorer; 7] = [
        Scorer::RocAuc,
        Scorer::Accuracy,
        Scorer::BalancedAccuracy,
        Scorer::Precision,
        Scorer::Recall,
        Scorer::F1,
        Scorer::NegLogLoss,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scorer::RocAuc => "roc_auc",
            Scorer::Accuracy => "accuracy",
            Scorer::BalancedAccuracy => "balanced_accuracy",
            Scorer::Precision => "precision",
            Scorer::Recall => "recall",
            Scorer::F1 => "f1",
            Scorer::NegLogLoss => "neg_log_loss",
        }
    }

    /// Score a fitted estimator on the given rows
    pub fn score<E: Classifier>(&self, estimator: &E, x: &FeatureMatrix, y: &[u8]) -> Result<f64> {
        let proba = estimator.predict_proba(x)?;
        self.score_proba(y, &proba)
    }

    /// Score class-1 probabilities against labels
    pub fn score_proba(&self, y: &[u8], proba: &[f64]) -> Result<f64> {
        if y.len() != proba.len() {
            return Err(RfeError::Scoring(format!(
                "{} labels but {} predictions",
                y.len(),
                proba.len()
            )));
        }
        if y.is_empty() {
            return Err(RfeError::Scoring("Cannot score an empty set".into()));
        }

        let c = Confusion::new(y, proba);
        let score = match self {
            Scorer::RocAuc => roc_auc(y, proba)?,
            Scorer::NegLogLoss => -log_loss(y, proba),
            Scorer::Accuracy => (c.tp + c.tn) / c.total(),
            Scorer::BalancedAccuracy => {
                let tpr = ratio(c.tp, c.tp + c.fn_);
                let tnr = ratio(c.tn, c.tn + c.fp);
                // A class absent from y does not count towards the mean
                let present = [c.tp + c.fn_ > 0.0, c.tn + c.fp > 0.0];
                let n = present.iter().filter(|p| **p).count() as f64;
                (tpr + tnr) / n
            }
            Scorer::Precision => ratio(c.tp, c.tp + c.fp),
            Scorer::Recall => ratio(c.tp, c.tp + c.fn_),
            Scorer::F1 => ratio(2.0 * c.tp, 2.0 * c.tp + c.fp + c.fn_),
        };

        Ok(score)
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scorer {
    type Err = RfeError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Scorer::ALL
            .iter()
            .copied()
            .find(|scorer| scorer.name() == key)
            .ok_or_else(|| {
                let valid: Vec<&str> = Scorer::ALL.iter().map(|s| s.name()).collect();
                RfeError::InvalidConfig(format!(
                    "Unknown scoring '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Confusion counts at the 0.5 threshold
struct Confusion {
    tp: f64,
    tn: f64,
    fp: f64,
    fn_: f64,
}

impl Confusion {
    fn new(y: &[u8], proba: &[f64]) -> Self {
        let mut c = Confusion {
            tp: 0.0,
            tn: 0.0,
            fp: 0.0,
            fn_: 0.0,
        };
        for (&label, &p) in y.iter().zip(proba) {
            match (label == 1, p > 0.5) {
                (true, true) => c.tp += 1.0,
                (false, false) => c.tn += 1.0,
                (false, true) => c.fp += 1.0,
                (true, false) => c.fn_ += 1.0,
            }
        }
        c
    }

    fn total(&self) -> f64 {
        self.tp + self.tn + self.fp + self.fn_
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Area under the ROC curve via average ranks (ties share their mean rank)
pub fn roc_auc(y: &[u8], proba: &[f64]) -> Result<f64> {
    let n_pos = y.iter().filter(|&&v| v == 1).count();
    let n_neg = y.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RfeError::Scoring(
            "Only one class present in y_true. ROC AUC score is not defined in that case.".into(),
        ));
    }

    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&a, &b| proba[a].total_cmp(&proba[b]));

    let mut ranks = vec![0.0; proba.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && proba[order[j + 1]] == proba[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie group
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y
        .iter()
        .zip(&ranks)
        .filter(|(&label, _)| label == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;

    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

fn log_loss(y: &[u8], proba: &[f64]) -> f64 {
    let total: f64 = y
        .iter()
        .zip(proba)
        .map(|(&label, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = [1, 0, 1, 0];
        assert_eq!(roc_auc(&y, &[0.9, 0.1, 0.8, 0.2]).unwrap(), 1.0);
        assert_eq!(roc_auc(&y, &[0.1, 0.9, 0.2, 0.8]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_ties() {
        let y = [1, 0, 1, 0];
        assert_eq!(roc_auc(&y, &[0.5, 0.5, 0.5, 0.5]).unwrap(), 0.5);
        // One positive tied with one negative
        let auc = roc_auc(&[1, 0, 0], &[0.7, 0.7, 0.1]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class_is_error() {
        let err = roc_auc(&[1, 1], &[0.2, 0.9]).unwrap_err();
        assert!(matches!(err, RfeError::Scoring(_)));
    }

    #[test]
    fn test_threshold_metrics() {
        let y = [1, 1, 0, 0];
        let proba = [0.9, 0.4, 0.6, 0.1];
        assert_eq!(Scorer::Accuracy.score_proba(&y, &proba).unwrap(), 0.5);
        assert_eq!(Scorer::Precision.score_proba(&y, &proba).unwrap(), 0.5);
        assert_eq!(Scorer::Recall.score_proba(&y, &proba).unwrap(), 0.5);
        assert_eq!(Scorer::F1.score_proba(&y, &proba).unwrap(), 0.5);
        assert_eq!(Scorer::BalancedAccuracy.score_proba(&y, &proba).unwrap(), 0.5);
    }

    #[test]
    fn test_empty_denominators_score_zero() {
        let y = [0, 0];
        let proba = [0.1, 0.2];
        assert_eq!(Scorer::Precision.score_proba(&y, &proba).unwrap(), 0.0);
        assert_eq!(Scorer::F1.score_proba(&y, &proba).unwrap(), 0.0);
    }

    #[test]
    fn test_neg_log_loss() {
        let y = [1, 0];
        let score = Scorer::NegLogLoss.score_proba(&y, &[1.0, 0.0]).unwrap();
        assert!(score <= 0.0 && score > -1e-10);
        let worse = Scorer::NegLogLoss.score_proba(&y, &[0.6, 0.4]).unwrap();
        assert!(worse < score);
    }

    #[test]
    fn test_scorer_from_str() {
        assert_eq!("roc_auc".parse::<Scorer>().unwrap(), Scorer::RocAuc);
        assert_eq!("F1".parse::<Scorer>().unwrap(), Scorer::F1);
        let err = "r2".parse::<Scorer>().unwrap_err();
        assert!(err.to_string().contains("roc_auc"));
    }
}
