//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use shaprfe::FeatureMatrix;
use std::path::PathBuf;
use tempfile::TempDir;

/// The eight-row fixture used across the elimination tests.
///
/// `col_3` is identical to the target, `col_1` and `col_2` only separate
/// the last row.
pub fn create_fixture() -> (FeatureMatrix, Vec<u8>) {
    let x = FeatureMatrix::from_rows(
        &["col_1", "col_2", "col_3"],
        &[
            vec![1.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ],
    )
    .unwrap();
    (x, vec![1, 0, 1, 0, 1, 0, 1, 0])
}

/// The same fixture as a DataFrame with a `target` column
pub fn create_fixture_dataframe() -> DataFrame {
    df! {
        "col_1" => [1i32, 1, 1, 1, 1, 1, 1, 0],
        "col_2" => [0i32, 0, 0, 0, 0, 0, 0, 1],
        "col_3" => [1i32, 0, 1, 0, 1, 0, 1, 0],
        "target" => [1i32, 0, 1, 0, 1, 0, 1, 0],
    }
    .unwrap()
}

/// A noisier dataset with one informative feature, one weak feature and noise.
///
/// Deterministic so that tests do not depend on a random generator.
pub fn create_signal_dataframe(rows: usize) -> DataFrame {
    let target: Vec<i32> = (0..rows).map(|i| (i % 2) as i32).collect();
    let informative: Vec<f64> = target
        .iter()
        .enumerate()
        .map(|(i, &t)| t as f64 * 5.0 + (i % 7) as f64 * 0.3)
        .collect();
    let weak: Vec<f64> = target
        .iter()
        .enumerate()
        .map(|(i, &t)| if i % 5 == 0 { 1.0 - t as f64 } else { t as f64 })
        .collect();
    let noise_a: Vec<f64> = (0..rows).map(|i| ((i * 37) % 11) as f64).collect();
    let noise_b: Vec<f64> = (0..rows).map(|i| ((i * 13) % 17) as f64 / 3.0).collect();

    df! {
        "informative" => informative,
        "weak" => weak,
        "noise_a" => noise_a,
        "noise_b" => noise_b,
        "target" => target,
    }
    .unwrap()
}

/// Create a larger random DataFrame for performance/stress tests
pub fn create_large_test_dataframe(rows: usize, cols: usize) -> DataFrame {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let mut columns: Vec<Column> = Vec::with_capacity(cols + 1);

    let target: Vec<i32> = (0..rows).map(|_| rng.gen_range(0..2)).collect();
    columns.push(Column::new("target".into(), target));

    for i in 0..cols {
        let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
        columns.push(Column::new(format!("feature_{}", i).into(), values));
    }

    DataFrame::new(columns).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}
