//! Randomized hyperparameter search with cross-validation

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use super::cv::CvStrategy;
use super::scoring::Scorer;
use crate::error::{Result, RfeError};
use crate::model::{Classifier, HyperParams, ParamGrid, ParamValue};
use crate::pipeline::FeatureMatrix;

/// Cross-validated outcome of one parameter candidate
#[derive(Debug, Clone, Serialize)]
pub struct CandidateResult {
    pub params: BTreeMap<String, ParamValue>,
    /// `NaN` where the fold failed
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Samples `n_iter` points from a parameter grid, cross-validates each and
/// refits the best one on the full data unless `refit(false)` is set.
#[derive(Debug, Clone)]
pub struct RandomizedSearchCv<E> {
    estimator: E,
    param_distributions: ParamGrid,
    n_iter: usize,
    cv: CvStrategy,
    scoring: Scorer,
    random_state: Option<u64>,
    refit: bool,
    results: Vec<CandidateResult>,
    best_index: Option<usize>,
    best_estimator: Option<E>,
    warnings: Vec<String>,
}

impl<E: Classifier + HyperParams> RandomizedSearchCv<E> {
    pub fn new(estimator: E, param_distributions: ParamGrid) -> Self {
        Self {
            estimator,
            param_distributions,
            n_iter: 10,
            cv: CvStrategy::from(5),
            scoring: Scorer::RocAuc,
            random_state: None,
            refit: true,
            results: Vec::new(),
            best_index: None,
            best_estimator: None,
            warnings: Vec::new(),
        }
    }

    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn cv(mut self, cv: impl Into<CvStrategy>) -> Self {
        self.cv = cv.into();
        self
    }

    pub fn scoring(mut self, scoring: Scorer) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Skip fitting the best candidate on the full data after the search
    pub fn refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Base estimator the candidates are cloned from
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    pub fn param_distributions(&self) -> &ParamGrid {
        &self.param_distributions
    }

    pub fn get_random_state(&self) -> Option<u64> {
        self.random_state
    }

    pub(crate) fn set_random_state_if_unset(&mut self, seed: u64) {
        self.random_state.get_or_insert(seed);
    }

    pub fn results(&self) -> &[CandidateResult] {
        &self.results
    }

    pub fn best_params(&self) -> Option<&BTreeMap<String, ParamValue>> {
        self.best_index.map(|i| &self.results[i].params)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|i| self.results[i].mean_score)
    }

    pub fn best_estimator(&self) -> Option<&E> {
        self.best_estimator.as_ref()
    }

    /// Warnings from the last `fit`
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if self.param_distributions.is_empty() {
            return Err(RfeError::InvalidConfig("Parameter grid is empty".into()));
        }
        if self.n_iter == 0 {
            return Err(RfeError::InvalidConfig("n_iter must be at least 1".into()));
        }

        self.results.clear();
        self.best_index = None;
        self.best_estimator = None;
        self.warnings.clear();

        let grid_size = self.param_distributions.size();
        if grid_size < self.n_iter {
            self.warnings.push(format!(
                "The total space of parameters {} is smaller than n_iter={}. Running {} iterations.",
                grid_size, self.n_iter, grid_size
            ));
        }

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let picks = sample(&mut rng, grid_size, self.n_iter.min(grid_size)).into_vec();

        let (folds, cv_warnings) = self.cv.split(y)?;
        self.warnings.extend(cv_warnings);

        let evaluated: Vec<(CandidateResult, Vec<String>)> = picks
            .par_iter()
            .map(|&pick| self.evaluate(self.param_distributions.point(pick), x, y, &folds))
            .collect::<Result<_>>()?;

        for (result, warnings) in evaluated {
            self.results.push(result);
            self.warnings.extend(warnings);
        }

        // Highest finite mean wins; ties keep the earlier candidate
        let best_index = self
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.mean_score.is_finite())
            .fold(None::<(usize, f64)>, |best, (i, r)| match best {
                Some((_, score)) if score >= r.mean_score => best,
                _ => Some((i, r.mean_score)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| {
                RfeError::Estimator(format!(
                    "All {} parameter candidates failed to fit",
                    self.results.len()
                ))
            })?;

        self.best_index = Some(best_index);
        if self.refit {
            let mut best = self.estimator.clone();
            best.set_params(&self.results[best_index].params)?;
            best.fit(x, y)?;
            self.best_estimator = Some(best);
        }
        Ok(())
    }

    /// Cross-validate one candidate; fold failures become `NaN` plus a warning
    fn evaluate(
        &self,
        params: BTreeMap<String, ParamValue>,
        x: &FeatureMatrix,
        y: &[u8],
        folds: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<(CandidateResult, Vec<String>)> {
        let mut candidate = self.estimator.clone();
        candidate.set_params(&params)?;

        let mut warnings = Vec::new();
        let mut fold_scores = Vec::with_capacity(folds.len());

        for (train, val) in folds {
            let score = fit_and_score(candidate.clone(), x, y, train, val, self.scoring);
            match score {
                Ok(s) => fold_scores.push(s),
                Err(e) => {
                    warnings.push(format!(
                        "Estimator fit failed. The score on this train-test partition for these parameters will be set to nan. Details: {}",
                        e
                    ));
                    fold_scores.push(f64::NAN);
                }
            }
        }

        let (mean_score, std_score) = mean_std(&fold_scores);
        Ok((
            CandidateResult {
                params,
                fold_scores,
                mean_score,
                std_score,
            },
            warnings,
        ))
    }
}

fn fit_and_score<E: Classifier>(
    mut estimator: E,
    x: &FeatureMatrix,
    y: &[u8],
    train: &[usize],
    val: &[usize],
    scoring: Scorer,
) -> Result<f64> {
    let x_train = x.take_rows(train);
    let y_train: Vec<u8> = train.iter().map(|&i| y[i]).collect();
    estimator.fit(&x_train, &y_train)?;

    let x_val = x.take_rows(val);
    let y_val: Vec<u8> = val.iter().map(|&i| y[i]).collect();
    scoring.score(&estimator, &x_val, &y_val)
}

/// Mean and population standard deviation; `NaN` propagates
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
