//! Target column analysis and label extraction
//!
//! The estimators are binary classifiers and need labels as 0/1. A target
//! column that is already binary is used as-is; anything else needs a
//! `TargetMapping` naming the event and non-event values.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping configuration for converting target column values to binary 0/1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMapping {
    /// Value that maps to 1 (event)
    pub event_value: String,
    /// Value that maps to 0 (non-event)
    pub non_event_value: String,
}

impl TargetMapping {
    pub fn new(event_value: impl Into<String>, non_event_value: impl Into<String>) -> Self {
        Self {
            event_value: event_value.into(),
            non_event_value: non_event_value.into(),
        }
    }
}

/// Result of analyzing a target column
#[derive(Debug, Clone)]
pub enum TargetAnalysis {
    /// Target column is already binary 0/1, no mapping needed
    AlreadyBinary,
    /// Target column needs mapping - contains these unique values
    NeedsMapping { unique_values: Vec<String> },
}

/// Decide whether a target column can be used directly as 0/1 labels
pub fn analyze_target_column(df: &DataFrame, target: &str) -> Result<TargetAnalysis> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    if target_col.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", target);
    }

    if target_col.null_count() == target_col.len() {
        anyhow::bail!("Target column '{}' contains only null values", target);
    }

    if target_col.dtype().is_primitive_numeric() || target_col.dtype() == &DataType::Boolean {
        let float_col = target_col.cast(&DataType::Float64)?;
        let is_binary = float_col
            .f64()?
            .into_iter()
            .flatten()
            .all(|v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);

        if is_binary && target_col.null_count() == 0 {
            return Ok(TargetAnalysis::AlreadyBinary);
        }
    }

    let mut unique_values: Vec<String> = column_to_strings(target_col)?
        .into_iter()
        .flatten()
        .collect();
    unique_values.sort();
    unique_values.dedup();

    Ok(TargetAnalysis::NeedsMapping { unique_values })
}

/// Map each row of the target column to `Some(1)`, `Some(0)` or `None` (unmatched)
pub fn create_target_mask(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<Vec<Option<u8>>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    let mask = column_to_strings(target_col)?
        .into_iter()
        .map(|v| match v {
            Some(s) if s == mapping.event_value => Some(1),
            Some(s) if s == mapping.non_event_value => Some(0),
            _ => None,
        })
        .collect();

    Ok(mask)
}

/// Extract 0/1 labels from a binary target column
pub fn binary_labels(df: &DataFrame, target: &str) -> Result<Vec<u8>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    let float_col = target_col.cast(&DataType::Float64)?;
    float_col
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if x.abs() < TOLERANCE => Ok(0),
            Some(x) if (x - 1.0).abs() < TOLERANCE => Ok(1),
            Some(x) => anyhow::bail!("Target '{}' has non-binary value {} at row {}", target, x, row),
            None => anyhow::bail!("Target '{}' has a null value at row {}", target, row),
        })
        .collect()
}

/// Resolve labels for the target column and drop rows whose target does not map.
///
/// Returns the (possibly filtered) DataFrame, its labels, and the number of rows dropped.
pub fn prepare_labels(
    df: DataFrame,
    target: &str,
    mapping: Option<&TargetMapping>,
) -> Result<(DataFrame, Vec<u8>, usize)> {
    match (analyze_target_column(&df, target)?, mapping) {
        (TargetAnalysis::AlreadyBinary, None) => {
            let labels = binary_labels(&df, target)?;
            Ok((df, labels, 0))
        }
        (_, Some(mapping)) => {
            let mask = create_target_mask(&df, target, mapping)?;
            let keep: Vec<bool> = mask.iter().map(|v| v.is_some()).collect();
            let dropped = keep.iter().filter(|k| !**k).count();
            let labels: Vec<u8> = mask.into_iter().flatten().collect();

            if labels.is_empty() {
                anyhow::bail!(
                    "No rows of '{}' match event value '{}' or non-event value '{}'",
                    target,
                    mapping.event_value,
                    mapping.non_event_value
                );
            }

            let keep_mask = BooleanChunked::new("keep".into(), &keep);
            let filtered = df.filter(&keep_mask)?;
            Ok((filtered, labels, dropped))
        }
        (TargetAnalysis::NeedsMapping { unique_values }, None) => {
            anyhow::bail!(
                "Target column '{}' is not binary 0/1 (values: {:?}). Use --event-value and --non-event-value to map it.",
                target,
                unique_values
            )
        }
    }
}

/// Convert a column to a Vec of Option<String> for comparison
fn column_to_strings(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => col
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect(),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => col
            .cast(&DataType::UInt64)?
            .u64()?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect(),
        DataType::Float32 | DataType::Float64 => col
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|n| format!("{}", n)))
            .collect(),
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => col
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_binary_int_target() {
        let df = df! {
            "target" => [0i32, 1, 0, 1, 0, 1],
        }
        .unwrap();

        let result = analyze_target_column(&df, "target").unwrap();
        assert!(matches!(result, TargetAnalysis::AlreadyBinary));
    }

    #[test]
    fn test_analyze_string_target() {
        let df = df! {
            "target" => ["G", "B", "G", "B", "G"],
        }
        .unwrap();

        match analyze_target_column(&df, "target").unwrap() {
            TargetAnalysis::NeedsMapping { unique_values } => {
                assert_eq!(unique_values, vec!["B".to_string(), "G".to_string()]);
            }
            _ => panic!("Expected NeedsMapping"),
        }
    }

    #[test]
    fn test_analyze_non_binary_numeric_target() {
        let df = df! {
            "target" => [1i32, 2, 3, 1, 2, 3],
        }
        .unwrap();

        match analyze_target_column(&df, "target").unwrap() {
            TargetAnalysis::NeedsMapping { unique_values } => assert_eq!(unique_values.len(), 3),
            _ => panic!("Expected NeedsMapping"),
        }
    }

    #[test]
    fn test_create_target_mask() {
        let df = df! {
            "target" => ["G", "B", "G", "B", "X"],
        }
        .unwrap();

        let mapping = TargetMapping::new("B", "G");
        let mask = create_target_mask(&df, "target", &mapping).unwrap();
        assert_eq!(mask, vec![Some(0), Some(1), Some(0), Some(1), None]);
    }

    #[test]
    fn test_binary_labels() {
        let df = df! {
            "target" => [0.0f64, 1.0, 1.0, 0.0],
        }
        .unwrap();
        assert_eq!(binary_labels(&df, "target").unwrap(), vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_prepare_labels_filters_unmapped_rows() {
        let df = df! {
            "target" => ["bad", "good", "unknown", "bad"],
            "x" => [1.0f64, 2.0, 3.0, 4.0],
        }
        .unwrap();

        let mapping = TargetMapping::new("bad", "good");
        let (filtered, labels, dropped) = prepare_labels(df, "target", Some(&mapping)).unwrap();
        assert_eq!(labels, vec![1, 0, 1]);
        assert_eq!(dropped, 1);
        assert_eq!(filtered.height(), 3);
    }

    #[test]
    fn test_prepare_labels_requires_mapping_for_strings() {
        let df = df! {
            "target" => ["yes", "no"],
        }
        .unwrap();

        let err = prepare_labels(df, "target", None).unwrap_err();
        assert!(err.to_string().contains("--event-value"));
    }

    #[test]
    fn test_analyze_empty_target() {
        let df = df! {
            "target" => Vec::<i32>::new(),
        }
        .unwrap();

        let result = analyze_target_column(&df, "target");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_analyze_all_null_target() {
        let df = df! {
            "target" => [None::<String>, None, None],
        }
        .unwrap();

        let result = analyze_target_column(&df, "target");
        assert!(result.unwrap_err().to_string().contains("null"));
    }
}
