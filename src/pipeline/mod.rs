//! Pipeline module - data preparation, cross-validation and elimination

pub mod cv;
pub mod dataset;
pub mod elimination;
pub mod importance;
pub mod loader;
pub mod scoring;
pub mod search;
pub mod target;

pub use cv::{CvStrategy, Folds, KFold, StratifiedKFold};
pub use dataset::*;
pub use elimination::*;
pub use importance::*;
pub use loader::*;
pub use scoring::Scorer;
pub use search::{CandidateResult, RandomizedSearchCv};
pub use target::*;
