//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

/// ShapRFE - Recursive feature elimination with SHAP importance and cross-validation
#[derive(Parser, Debug)]
#[command(name = "shaprfe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Target column name (binary).
    /// If not provided, will be selected interactively from available columns.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Value in target column that represents EVENT (maps to 1).
    /// Required with --non-event-value when target is not binary 0/1.
    #[arg(long, requires = "non_event_value")]
    pub event_value: Option<String>,

    /// Value in target column that represents NON-EVENT (maps to 0).
    /// Required with --event-value when target is not binary 0/1.
    #[arg(long, requires = "event_value")]
    pub non_event_value: Option<String>,

    /// Columns to drop before processing (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Estimator used in every round
    #[arg(long, value_enum, default_value = "tree")]
    pub model: ModelKind,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    pub min_samples_split: usize,

    /// Minimum samples required in each leaf
    #[arg(long, default_value = "1")]
    pub min_samples_leaf: usize,

    /// Split criterion: gini or entropy
    #[arg(long, default_value = "gini")]
    pub criterion: String,

    /// Number of trees (forest only)
    #[arg(long, default_value = "100")]
    pub n_estimators: usize,

    /// Features examined per split: all, sqrt, log2, a count or a fraction.
    /// Defaults to all for a single tree and sqrt for a forest.
    #[arg(long)]
    pub max_features: Option<String>,

    /// Hyperparameter grid searched every round, e.g. "max_depth=2,3,5;criterion=gini,entropy"
    #[arg(long)]
    pub search_grid: Option<String>,

    /// Candidates sampled from the grid per round
    #[arg(long, default_value = "10")]
    pub search_iter: usize,

    /// Cross-validation folds used inside the search
    #[arg(long, default_value = "5")]
    pub search_cv: usize,

    /// Features removed per round: an integer count or a fraction in (0, 1)
    #[arg(long, default_value = "1")]
    pub step: String,

    /// Elimination stops at this many features
    #[arg(long, default_value = "1")]
    pub min_features: usize,

    /// Cross-validation folds (stratified)
    #[arg(long, default_value = "5", value_parser = validate_folds)]
    pub cv: usize,

    /// Metric: roc_auc, accuracy, balanced_accuracy, precision, recall, f1, neg_log_loss
    #[arg(long, default_value = "roc_auc")]
    pub scoring: String,

    /// Parallel fold workers (-1 = all cores)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    pub n_jobs: i32,

    /// Verbosity: 0 quiet, >0 warnings, >50 per-round details, >100 per-fold details
    #[arg(long, default_value = "51")]
    pub verbose: usize,

    /// Seed for estimators, search sampling and shuffled folds
    #[arg(long)]
    pub random_state: Option<u64>,

    /// JSON report path.
    /// Defaults to the input directory with a '_shap_rfe.json' suffix.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Show the score chart after fitting
    #[arg(long, default_value = "false")]
    pub plot: bool,

    /// Write the dataset reduced to the round with this many features
    #[arg(long)]
    pub keep_features: Option<usize>,

    /// Output file path for the reduced dataset (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_reduced' suffix (e.g., data.csv → data_reduced.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip interactive prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// Single CART decision tree
    Tree,
    /// Bagged random forest
    Forest,
}

impl Cli {
    /// Get the output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derived_path(&self.input, "_reduced", None))
    }

    /// Get the JSON report path, deriving from input if not explicitly provided.
    pub fn report_path(&self) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| derived_path(&self.input, "_shap_rfe", Some("json")))
    }
}

/// `<dir>/<stem><suffix>.<ext>`, keeping the input extension when `ext` is `None`
fn derived_path(input: &Path, suffix: &str, ext: Option<&str>) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = ext.unwrap_or_else(|| {
        input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("parquet")
    });
    parent.join(format!("{}{}.{}", stem, suffix, extension))
}

/// Validator for cross-validation fold counts
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value < 2 {
        Err(format!("cv must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
