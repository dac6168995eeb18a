//! Per-round elimination results and their exports
//!
//! An `EliminationReport` holds one `RoundRecord` per elimination round in
//! round order. It can be printed as a table, converted to a polars
//! DataFrame or written to JSON together with run metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, RfeError};
use crate::model::ParamValue;
use crate::pipeline::FeatureImportance;

/// Outcome of a single elimination round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    /// 1-based round index
    pub round: usize,
    pub num_features: usize,
    pub features_set: Vec<String>,
    pub eliminated_features: Vec<String>,
    pub train_metric_mean: f64,
    pub train_metric_std: f64,
    pub val_metric_mean: f64,
    pub val_metric_std: f64,
    /// Mean |SHAP| ranking, most important first
    pub feature_importance: Vec<FeatureImportance>,
    /// Hyperparameters chosen by the search for this round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, ParamValue>>,
}

impl RoundRecord {
    /// Features still in play after this round's elimination
    pub fn remaining_features(&self) -> Vec<String> {
        self.features_set
            .iter()
            .filter(|f| !self.eliminated_features.contains(f))
            .cloned()
            .collect()
    }
}

/// Settings and context of an elimination run, written alongside the rounds
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub timestamp: String,
    pub shaprfe_version: String,
    pub estimator: String,
    pub scoring: String,
    pub step: String,
    pub cv: String,
    pub min_features_to_select: usize,
    pub n_samples: usize,
    pub n_features: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
}

impl RunMetadata {
    /// Metadata stamped with the current UTC time and crate version
    pub fn now(
        estimator: impl Into<String>,
        scoring: impl Into<String>,
        step: impl Into<String>,
        cv: impl Into<String>,
        min_features_to_select: usize,
        n_samples: usize,
        n_features: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            shaprfe_version: env!("CARGO_PKG_VERSION").to_string(),
            estimator: estimator.into(),
            scoring: scoring.into(),
            step: step.into(),
            cv: cv.into(),
            min_features_to_select,
            n_samples,
            n_features,
            input_file: None,
            target_column: None,
        }
    }

    pub fn with_input(mut self, input_file: impl Into<String>, target_column: impl Into<String>) -> Self {
        self.input_file = Some(input_file.into());
        self.target_column = Some(target_column.into());
        self
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_round: Option<usize>,
    rounds: &'a [RoundRecord],
}

/// All rounds of a fitted elimination, in round order
#[derive(Debug, Clone, Default, Serialize)]
pub struct EliminationReport {
    rounds: Vec<RoundRecord>,
}

impl EliminationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Number of rounds
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn round(&self, round: usize) -> Option<&RoundRecord> {
        self.rounds.iter().find(|r| r.round == round)
    }

    pub fn round_with_features(&self, num_features: usize) -> Option<&RoundRecord> {
        self.rounds.iter().find(|r| r.num_features == num_features)
    }

    /// Round with the highest mean validation score; ties go to fewer features
    pub fn best_round(&self) -> Option<&RoundRecord> {
        self.rounds
            .iter()
            .filter(|r| r.val_metric_mean.is_finite())
            .fold(None, |best: Option<&RoundRecord>, r| match best {
                Some(b)
                    if b.val_metric_mean > r.val_metric_mean
                        || (b.val_metric_mean == r.val_metric_mean
                            && b.num_features <= r.num_features) =>
                {
                    Some(b)
                }
                _ => Some(r),
            })
    }

    /// One row per round. Search runs get a `param_<name>` column per parameter.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![
            Column::new(
                "round".into(),
                self.rounds.iter().map(|r| r.round as u32).collect::<Vec<_>>(),
            ),
            Column::new(
                "num_features".into(),
                self.rounds.iter().map(|r| r.num_features as u32).collect::<Vec<_>>(),
            ),
            Column::new(
                "features_set".into(),
                self.rounds
                    .iter()
                    .map(|r| r.features_set.join(", "))
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "eliminated_features".into(),
                self.rounds
                    .iter()
                    .map(|r| r.eliminated_features.join(", "))
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "train_metric_mean".into(),
                self.rounds.iter().map(|r| r.train_metric_mean).collect::<Vec<_>>(),
            ),
            Column::new(
                "train_metric_std".into(),
                self.rounds.iter().map(|r| r.train_metric_std).collect::<Vec<_>>(),
            ),
            Column::new(
                "val_metric_mean".into(),
                self.rounds.iter().map(|r| r.val_metric_mean).collect::<Vec<_>>(),
            ),
            Column::new(
                "val_metric_std".into(),
                self.rounds.iter().map(|r| r.val_metric_std).collect::<Vec<_>>(),
            ),
        ];

        let param_names: BTreeSet<&String> = self
            .rounds
            .iter()
            .filter_map(|r| r.params.as_ref())
            .flat_map(|p| p.keys())
            .collect();

        for name in param_names {
            let values: Vec<Option<String>> = self
                .rounds
                .iter()
                .map(|r| r.params.as_ref().and_then(|p| p.get(name)).map(|v| v.to_string()))
                .collect();
            columns.push(Column::new(format!("param_{}", name).into(), values));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write `{ metadata, best_round, rounds }` as pretty JSON
    pub fn write_json(&self, path: &Path, metadata: &RunMetadata) -> Result<()> {
        let report = JsonReport {
            metadata,
            best_round: self.best_round().map(|r| r.round),
            rounds: &self.rounds,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| RfeError::Io(std::io::Error::other(e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Print the rounds as a table
    pub fn display(&self, scoring: &str) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("ELIMINATION REPORT").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let best = self.best_round().map(|r| r.round);

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Round").add_attribute(Attribute::Bold),
            Cell::new("Features").add_attribute(Attribute::Bold),
            Cell::new(format!("Train {}", scoring)).add_attribute(Attribute::Bold),
            Cell::new(format!("Val {}", scoring)).add_attribute(Attribute::Bold),
            Cell::new("Eliminated").add_attribute(Attribute::Bold),
        ]);

        for r in &self.rounds {
            let val_cell = Cell::new(format!("{:.4} ± {:.4}", r.val_metric_mean, r.val_metric_std))
                .set_alignment(CellAlignment::Right);
            let val_cell = if Some(r.round) == best {
                val_cell.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                val_cell
            };

            table.add_row(vec![
                Cell::new(r.round),
                Cell::new(r.num_features).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.4} ± {:.4}", r.train_metric_mean, r.train_metric_std))
                    .set_alignment(CellAlignment::Right),
                val_cell,
                Cell::new(truncate_list(&r.eliminated_features, 40)).fg(
                    if r.eliminated_features.is_empty() {
                        Color::White
                    } else {
                        Color::Red
                    },
                ),
            ]);
        }

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}

fn truncate_list(items: &[String], max_len: usize) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    let joined = items.join(", ");
    if joined.chars().count() <= max_len {
        joined
    } else {
        let head: String = joined.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}... ({} total)", head, items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(round: usize, features: &[&str], eliminated: &[&str], val: f64) -> RoundRecord {
        RoundRecord {
            round,
            num_features: features.len(),
            features_set: features.iter().map(|s| s.to_string()).collect(),
            eliminated_features: eliminated.iter().map(|s| s.to_string()).collect(),
            train_metric_mean: 1.0,
            train_metric_std: 0.0,
            val_metric_mean: val,
            val_metric_std: 0.05,
            feature_importance: Vec::new(),
            params: None,
        }
    }

    fn sample_report() -> EliminationReport {
        let mut report = EliminationReport::new();
        report.push(record(1, &["a", "b", "c"], &["c"], 0.8));
        report.push(record(2, &["a", "b"], &["b"], 0.9));
        report.push(record(3, &["a"], &[], 0.9));
        report
    }

    #[test]
    fn test_lookup_and_remaining_features() {
        let report = sample_report();
        assert_eq!(report.len(), 3);
        assert_eq!(report.round_with_features(2).unwrap().round, 2);
        assert_eq!(report.round(1).unwrap().remaining_features(), vec!["a", "b"]);
        assert!(report.round(4).is_none());
    }

    #[test]
    fn test_best_round_prefers_fewer_features_on_tie() {
        let report = sample_report();
        assert_eq!(report.best_round().unwrap().round, 3);
    }

    #[test]
    fn test_to_dataframe() {
        let mut report = sample_report();
        let mut params = BTreeMap::new();
        params.insert("max_depth".to_string(), ParamValue::Int(2));
        report.rounds[0].params = Some(params);

        let df = report.to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert!(df.column("param_max_depth").is_ok());
        assert!(df.column("val_metric_mean").is_ok());
    }

    #[test]
    fn test_write_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let metadata = RunMetadata::now("DecisionTreeClassifier", "roc_auc", "1", "StratifiedKFold(n_splits=2)", 1, 8, 3);

        sample_report().write_json(&path, &metadata).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["rounds"].as_array().unwrap().len(), 3);
        assert_eq!(value["metadata"]["scoring"], "roc_auc");
        assert_eq!(value["best_round"], 3);
    }

    #[test]
    fn test_truncate_list() {
        assert_eq!(truncate_list(&[], 10), "-");
        let long: Vec<String> = (0..20).map(|i| format!("feature_{}", i)).collect();
        assert!(truncate_list(&long, 20).ends_with("(20 total)"));
    }
}
