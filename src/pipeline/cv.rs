//! Cross-validation splitters
//!
//! Splits return `(train_indices, validation_indices)` pairs. Validation
//! indices are sorted ascending within each fold.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::{Result, RfeError};

/// A list of (train, validation) index pairs
pub type Folds = Vec<(Vec<usize>, Vec<usize>)>;

fn check_n_splits(n_splits: usize, n_samples: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(RfeError::InvalidConfig(format!(
            "Cross-validation needs at least 2 folds, got {}",
            n_splits
        )));
    }
    if n_splits > n_samples {
        return Err(RfeError::InvalidConfig(format!(
            "Cannot have number of folds {} greater than the number of samples {}",
            n_splits, n_samples
        )));
    }
    Ok(())
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Turn per-sample fold assignments into index pairs
fn folds_from_assignment(assignment: &[usize], n_splits: usize) -> Folds {
    (0..n_splits)
        .map(|fold| {
            let (val, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&i| assignment[i] == fold);
            (train, val)
        })
        .collect()
}

/// Contiguous K-fold; the first `n % k` folds get one extra sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn split(&self, n_samples: usize) -> Result<Folds> {
        check_n_splits(self.n_splits, n_samples)?;

        let mut order: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            order.shuffle(&mut rng_for(self.seed));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut assignment = vec![0; n_samples];
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            for &i in &order[start..start + size] {
                assignment[i] = fold;
            }
            start += size;
        }

        Ok(folds_from_assignment(&assignment, self.n_splits))
    }
}

/// K-fold preserving the class ratio in every fold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Split labels into folds. Also returns warnings about sparse classes.
    ///
    /// Samples are sorted by class and dealt round-robin; each class then
    /// gives fold `k` as many samples as landed there, in original order.
    pub fn split(&self, y: &[u8]) -> Result<(Folds, Vec<String>)> {
        let n_samples = y.len();
        check_n_splits(self.n_splits, n_samples)?;

        let mut warnings = Vec::new();
        let mut classes: Vec<u8> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let counts: Vec<usize> = classes
            .iter()
            .map(|c| y.iter().filter(|&&v| v == *c).count())
            .collect();
        let min_count = counts.iter().copied().min().unwrap_or(0);
        if min_count < self.n_splits {
            warnings.push(format!(
                "The least populated class in y has only {} members, which is less than n_splits={}",
                min_count, self.n_splits
            ));
        }

        // Fold sizes per class from the round-robin deal over sorted labels
        let mut allocation = vec![vec![0usize; classes.len()]; self.n_splits];
        let mut sorted_class_idx = Vec::with_capacity(n_samples);
        for (ci, &count) in counts.iter().enumerate() {
            sorted_class_idx.extend(std::iter::repeat(ci).take(count));
        }
        for (pos, &ci) in sorted_class_idx.iter().enumerate() {
            allocation[pos % self.n_splits][ci] += 1;
        }

        let mut rng = rng_for(self.seed);
        let mut assignment = vec![0; n_samples];
        for (ci, class) in classes.iter().enumerate() {
            let mut fold_labels: Vec<usize> = (0..self.n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][ci]))
                .collect();
            if self.shuffle {
                fold_labels.shuffle(&mut rng);
            }
            let members = (0..n_samples).filter(|&i| y[i] == *class);
            for (i, fold) in members.zip(fold_labels) {
                assignment[i] = fold;
            }
        }

        Ok((folds_from_assignment(&assignment, self.n_splits), warnings))
    }
}

/// How folds are produced for the elimination loop and the search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CvStrategy {
    KFold(KFold),
    Stratified(StratifiedKFold),
}

impl CvStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CvStrategy::KFold(k) => k.n_splits,
            CvStrategy::Stratified(s) => s.n_splits,
        }
    }

    pub fn split(&self, y: &[u8]) -> Result<(Folds, Vec<String>)> {
        match self {
            CvStrategy::KFold(k) => Ok((k.split(y.len())?, Vec::new())),
            CvStrategy::Stratified(s) => s.split(y),
        }
    }

    /// Same strategy with shuffling seeded by `seed`, if it shuffles at all
    pub fn reseeded(self, seed: u64) -> Self {
        match self {
            CvStrategy::KFold(k) if k.shuffle => CvStrategy::KFold(k.with_shuffle(Some(seed))),
            CvStrategy::Stratified(s) if s.shuffle => {
                CvStrategy::Stratified(s.with_shuffle(Some(seed)))
            }
            other => other,
        }
    }
}

impl From<usize> for CvStrategy {
    fn from(n_splits: usize) -> Self {
        CvStrategy::Stratified(StratifiedKFold::new(n_splits))
    }
}

impl From<KFold> for CvStrategy {
    fn from(k: KFold) -> Self {
        CvStrategy::KFold(k)
    }
}

impl From<StratifiedKFold> for CvStrategy {
    fn from(s: StratifiedKFold) -> Self {
        CvStrategy::Stratified(s)
    }
}

impl std::fmt::Display for CvStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvStrategy::KFold(k) => write!(f, "KFold(n_splits={})", k.n_splits),
            CvStrategy::Stratified(s) => write!(f, "StratifiedKFold(n_splits={})", s.n_splits),
        }
    }
}
