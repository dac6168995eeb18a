//! Recursive feature elimination driven by cross-validated SHAP importance
//!
//! Each round fits the estimator (optionally after a hyperparameter search)
//! on every cross-validation fold, ranks the features in play by mean
//! absolute SHAP value on the validation rows and drops the least important
//! ones. Rounds continue until the minimum feature count is reached.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use console::style;
use faer::Mat;
use rayon::prelude::*;
use serde::Serialize;

use super::cv::CvStrategy;
use super::importance::shap_importance;
use super::scoring::Scorer;
use super::search::{mean_std, RandomizedSearchCv};
use crate::error::{Result, RfeError};
use crate::model::{check_fit_input, Classifier, HyperParams, ParamValue};
use crate::pipeline::FeatureMatrix;
use crate::report::{EliminationReport, PlotHandle, RoundRecord, RunMetadata};
use crate::utils::print_warning;

/// Verbosity above which every round is summarised on stdout
const VERBOSE_ROUNDS: usize = 50;
/// Verbosity above which fold scores and search results are printed
const VERBOSE_FOLDS: usize = 100;

/// How many features to request for removal each round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Step {
    /// A fixed number of features
    Count(usize),
    /// A fraction of the features currently in play, in (0, 1)
    Fraction(f64),
}

impl Default for Step {
    fn default() -> Self {
        Step::Count(1)
    }
}

impl Step {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Step::Count(0) => Err(RfeError::InvalidConfig(
                "step must be at least 1 when given as a count".into(),
            )),
            Step::Fraction(f) if !(f > 0.0 && f < 1.0) => Err(RfeError::InvalidConfig(format!(
                "step given as a fraction must be in (0, 1), got {}",
                f
            ))),
            _ => Ok(()),
        }
    }

    /// Number of features requested for removal out of `current`
    pub fn requested(&self, current: usize) -> usize {
        match *self {
            Step::Count(k) => k,
            Step::Fraction(f) => ((f * current as f64).floor() as usize).max(1),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Count(k) => write!(f, "{}", k),
            Step::Fraction(x) => write!(f, "{}", x),
        }
    }
}

impl FromStr for Step {
    type Err = RfeError;

    /// Integers are counts, anything with a decimal point is a fraction
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let step = if let Ok(k) = s.parse::<usize>() {
            Step::Count(k)
        } else if let Ok(f) = s.parse::<f64>() {
            Step::Fraction(f)
        } else {
            return Err(RfeError::InvalidConfig(format!(
                "Invalid step '{}': expected a positive integer or a fraction in (0, 1)",
                s
            )));
        };
        step.validate()?;
        Ok(step)
    }
}

/// Number of features to remove this round without going below the floor
pub fn calculate_number_of_features_to_remove(
    current_num_of_features: usize,
    num_features_to_remove: usize,
    min_num_features_to_keep: usize,
) -> usize {
    if current_num_of_features <= min_num_features_to_keep {
        0
    } else {
        num_features_to_remove.min(current_num_of_features - min_num_features_to_keep)
    }
}

/// Output of one fold: validation SHAP values and both scores
#[derive(Debug, Clone)]
pub struct FoldResult {
    /// `val_rows × features`
    pub shap_values: Mat<f64>,
    pub train_score: f64,
    pub val_score: f64,
}

/// Fit a clone of `clf` on the training rows, score it on both sides and
/// explain the validation rows.
pub fn get_feature_shap_values_per_fold<E: Classifier>(
    x: &FeatureMatrix,
    y: &[u8],
    clf: &E,
    train_index: &[usize],
    val_index: &[usize],
    scorer: Scorer,
) -> Result<FoldResult> {
    let x_train = x.take_rows(train_index);
    let y_train: Vec<u8> = train_index.iter().map(|&i| y[i]).collect();
    let x_val = x.take_rows(val_index);
    let y_val: Vec<u8> = val_index.iter().map(|&i| y[i]).collect();

    let mut estimator = clf.clone();
    estimator.fit(&x_train, &y_train)?;

    let train_score = scorer.score(&estimator, &x_train, &y_train)?;
    let val_score = scorer.score(&estimator, &x_val, &y_val)?;
    let shap_values = estimator.shap_values(&x_val)?;

    Ok(FoldResult {
        shap_values,
        train_score,
        val_score,
    })
}

/// Where each round's estimator comes from
#[derive(Debug, Clone)]
pub enum ModelSource<E> {
    Estimator(E),
    Search(RandomizedSearchCv<E>),
}

impl<E: Classifier + HyperParams> ModelSource<E> {
    fn base_estimator(&self) -> &E {
        match self {
            ModelSource::Estimator(e) => e,
            ModelSource::Search(s) => s.estimator(),
        }
    }
}

/// Recursive feature elimination with SHAP importance and cross-validation
#[derive(Debug, Clone)]
pub struct ShapRfeCv<E> {
    source: ModelSource<E>,
    step: Step,
    min_features_to_select: usize,
    cv: CvStrategy,
    scoring: Scorer,
    n_jobs: i32,
    verbose: usize,
    random_state: Option<u64>,
    report: Option<EliminationReport>,
    warnings: Vec<String>,
    n_samples: usize,
    n_features: usize,
}

impl<E: Classifier + HyperParams> ShapRfeCv<E> {
    fn with_source(source: ModelSource<E>) -> Self {
        Self {
            source,
            step: Step::default(),
            min_features_to_select: 1,
            cv: CvStrategy::from(5),
            scoring: Scorer::RocAuc,
            n_jobs: -1,
            verbose: 0,
            random_state: None,
            report: None,
            warnings: Vec::new(),
            n_samples: 0,
            n_features: 0,
        }
    }

    /// Eliminate with a fixed estimator
    pub fn new(estimator: E) -> Self {
        Self::with_source(ModelSource::Estimator(estimator))
    }

    /// Re-run a hyperparameter search on the remaining features every round
    pub fn with_search(search: RandomizedSearchCv<E>) -> Self {
        Self::with_source(ModelSource::Search(search))
    }

    pub fn step(mut self, step: Step) -> Self {
        self.step = step;
        self
    }

    pub fn min_features_to_select(mut self, min_features: usize) -> Self {
        self.min_features_to_select = min_features;
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

    /// Fold workers: `-1` for all cores, otherwise a positive thread count
    pub fn n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn verbose(mut self, verbose: usize) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn get_scoring(&self) -> Scorer {
        self.scoring
    }

    pub fn get_step(&self) -> Step {
        self.step
    }

    pub fn get_cv(&self) -> CvStrategy {
        self.cv
    }

    pub fn get_min_features_to_select(&self) -> usize {
        self.min_features_to_select
    }

    pub fn is_fitted(&self) -> bool {
        self.report.is_some()
    }

    pub fn check_if_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(RfeError::NotFitted)
        }
    }

    /// Warnings raised during the last `fit`
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.verbose > 0 {
            print_warning(&message);
        }
        self.warnings.push(message);
    }

    fn validate(&self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        self.step.validate()?;
        if self.min_features_to_select == 0 {
            return Err(RfeError::InvalidConfig(
                "min_features_to_select must be at least 1".into(),
            ));
        }
        if self.n_jobs == 0 || self.n_jobs < -1 {
            return Err(RfeError::InvalidConfig(format!(
                "n_jobs must be -1 or a positive number of threads, got {}",
                self.n_jobs
            )));
        }
        check_fit_input(x, y)?;
        if self.min_features_to_select > x.n_features() {
            return Err(RfeError::InvalidConfig(format!(
                "min_features_to_select ({}) exceeds the number of features ({})",
                self.min_features_to_select,
                x.n_features()
            )));
        }
        Ok(())
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let threads = if self.n_jobs == -1 { 0 } else { self.n_jobs as usize };
        Ok(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?)
    }

    /// Propagate `random_state` to the estimator, the search sampler and shuffled folds
    fn seeded(&self) -> Result<(ModelSource<E>, CvStrategy)> {
        let mut source = self.source.clone();
        let Some(seed) = self.random_state else {
            return Ok((source, self.cv));
        };

        let estimator = match &mut source {
            ModelSource::Estimator(e) => e,
            ModelSource::Search(s) => {
                s.set_random_state_if_unset(seed);
                s.estimator_mut()
            }
        };
        // Estimators without a random_state parameter are deterministic
        match estimator.params().get("random_state") {
            Some(ParamValue::Int(_)) | None => {}
            Some(_) => estimator.set_param("random_state", &ParamValue::Int(seed as i64))?,
        }

        Ok((source, self.cv.reseeded(seed)))
    }

    /// Run the elimination rounds
    pub fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<&mut Self> {
        self.validate(x, y)?;

        self.report = None;
        self.warnings.clear();
        self.n_samples = x.n_rows();
        self.n_features = x.n_features();

        let pool = self.thread_pool()?;
        let (source, cv) = self.seeded()?;

        let mut report = EliminationReport::new();
        let mut remaining: Vec<String> = x.feature_names().to_vec();
        let mut round = 0;

        loop {
            round += 1;
            let current = remaining.clone();
            let x_current = x.select_features(&current)?;

            let (estimator, params) = match &source {
                ModelSource::Estimator(e) => (e.clone(), None),
                ModelSource::Search(search) => {
                    // Rounds rebuild the estimator from the best params
                    let mut search = search.clone().refit(false);
                    pool.install(|| search.fit(&x_current, y))?;
                    let (estimator, params) = self.search_outcome(&search, round)?;
                    (estimator, Some(params))
                }
            };

            let (folds, cv_warnings) = cv.split(y)?;
            for w in cv_warnings {
                self.warn(w);
            }

            let scoring = self.scoring;
            let fold_results: Vec<FoldResult> = pool.install(|| {
                folds
                    .par_iter()
                    .map(|(train, val)| {
                        get_feature_shap_values_per_fold(&x_current, y, &estimator, train, val, scoring)
                    })
                    .collect::<Result<Vec<_>>>()
            })?;

            if self.verbose > VERBOSE_FOLDS {
                for (i, fold) in fold_results.iter().enumerate() {
                    println!(
                        "      Fold {}: train {} = {:.4}, validation {} = {:.4}",
                        i + 1,
                        scoring,
                        fold.train_score,
                        scoring,
                        fold.val_score
                    );
                }
            }

            let shap_blocks: Vec<Mat<f64>> =
                fold_results.iter().map(|f| f.shap_values.clone()).collect();
            let ranking = shap_importance(&shap_blocks, &current)?;

            let n_remove = calculate_number_of_features_to_remove(
                current.len(),
                self.step.requested(current.len()),
                self.min_features_to_select,
            );
            let eliminated: Vec<String> = ranking[ranking.len() - n_remove..]
                .iter()
                .map(|f| f.feature.clone())
                .collect();
            remaining = current
                .iter()
                .filter(|f| !eliminated.contains(f))
                .cloned()
                .collect();

            let train_scores: Vec<f64> = fold_results.iter().map(|f| f.train_score).collect();
            let val_scores: Vec<f64> = fold_results.iter().map(|f| f.val_score).collect();
            let (train_mean, train_std) = mean_std(&train_scores);
            let (val_mean, val_std) = mean_std(&val_scores);

            let record = RoundRecord {
                round,
                num_features: current.len(),
                features_set: current,
                eliminated_features: eliminated,
                train_metric_mean: train_mean,
                train_metric_std: train_std,
                val_metric_mean: val_mean,
                val_metric_std: val_std,
                feature_importance: ranking,
                params,
            };

            if self.verbose > VERBOSE_ROUNDS {
                print_round(&record, scoring);
            }

            report.push(record);

            if n_remove == 0 {
                break;
            }
        }

        self.report = Some(report);
        Ok(self)
    }

    /// Report a fitted search and build the round's estimator from its best params
    fn search_outcome(
        &mut self,
        search: &RandomizedSearchCv<E>,
        round: usize,
    ) -> Result<(E, BTreeMap<String, ParamValue>)> {
        for w in search.warnings().to_vec() {
            self.warn(w);
        }

        if self.verbose > VERBOSE_FOLDS {
            println!(
                "    {} round {}: {} candidates",
                style("Search").cyan(),
                round,
                search.results().len()
            );
            for result in search.results() {
                println!(
                    "      {:.4} ± {:.4}  {}",
                    result.mean_score,
                    result.std_score,
                    format_params(&result.params)
                );
            }
        }

        let best = search
            .best_params()
            .cloned()
            .ok_or_else(|| RfeError::Estimator("Search finished without a best candidate".into()))?;

        let mut estimator = search.estimator().clone();
        estimator.set_params(&best)?;
        Ok((estimator, best))
    }

    /// The elimination report of the last `fit`
    pub fn compute(&self) -> Result<&EliminationReport> {
        self.report.as_ref().ok_or(RfeError::NotFitted)
    }

    pub fn fit_compute(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<EliminationReport> {
        self.fit(x, y)?;
        self.compute().cloned()
    }

    /// Feature set of the round that used exactly `num_features` features
    pub fn get_reduced_features_set(&self, num_features: usize) -> Result<Vec<String>> {
        self.compute()?
            .round_with_features(num_features)
            .map(|r| r.features_set.clone())
            .ok_or(RfeError::UnknownFeatureCount(num_features))
    }

    /// Features remaining after the elimination step of `round` (1-based)
    pub fn features_at_round(&self, round: usize) -> Result<Vec<String>> {
        self.compute()?
            .round(round)
            .map(|r| r.remaining_features())
            .ok_or(RfeError::UnknownRound(round))
    }

    /// Chart of train and validation scores per feature count; `show` opens it
    pub fn plot(&self, show: bool) -> Result<PlotHandle> {
        let handle = PlotHandle::new(self.compute()?, self.scoring.name());
        if show {
            handle.show()?;
        }
        Ok(handle)
    }

    /// Metadata describing this run, for the JSON report
    pub fn metadata(&self) -> Result<RunMetadata> {
        self.check_if_fitted()?;
        Ok(RunMetadata::now(
            self.source.base_estimator().name(),
            self.scoring.name(),
            self.step.to_string(),
            self.cv.to_string(),
            self.min_features_to_select,
            self.n_samples,
            self.n_features,
        ))
    }
}

fn format_params(params: &BTreeMap<String, ParamValue>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_round(record: &RoundRecord, scoring: Scorer) {
    println!(
        "    {} {} {}",
        style(format!("Round {}", record.round)).cyan().bold(),
        style("│").dim(),
        style(format!("{} features", record.num_features)).white().bold()
    );
    println!(
        "      Train {}: {:.4} ± {:.4}",
        scoring, record.train_metric_mean, record.train_metric_std
    );
    println!(
        "      Validation {}: {:.4} ± {:.4}",
        scoring, record.val_metric_mean, record.val_metric_std
    );
    if let Some(params) = &record.params {
        println!("      Parameters: {}", format_params(params));
    }
    if !record.eliminated_features.is_empty() {
        println!(
            "      Removed: {}",
            style(record.eliminated_features.join(", ")).red()
        );
    }
}
