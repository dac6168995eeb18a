//! Tests for reading elimination inputs and writing reduced datasets

use polars::prelude::*;
use shaprfe::pipeline::{
    binary_labels, get_column_names, load_dataset, load_dataset_with_progress,
    partition_feature_columns, save_dataset,
};
use shaprfe::FeatureMatrix;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_fixture_csv_loads_into_feature_matrix() {
    let mut df = common::create_fixture_dataframe();
    let (_temp_dir, csv_path) = common::create_temp_csv(&mut df);

    let (loaded, rows, cols, _) = load_dataset_with_progress(&csv_path, 100).unwrap();
    assert_eq!((rows, cols), (8, 4));

    let (features, skipped) = partition_feature_columns(&loaded, &["target"]);
    assert_eq!(features, vec!["col_1", "col_2", "col_3"]);
    assert!(skipped.is_empty());

    let x = FeatureMatrix::from_frame(&loaded, &features).unwrap();
    let (expected, y) = common::create_fixture();
    assert_eq!(binary_labels(&loaded, "target").unwrap(), y);
    for i in 0..x.n_rows() {
        assert_eq!(x.row(i), expected.row(i), "row {} differs", i);
    }
}

#[test]
fn test_column_names_come_from_schema_only() {
    let mut df = common::create_signal_dataframe(12);
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let names = get_column_names(&parquet_path).unwrap();
    assert_eq!(names, vec!["informative", "weak", "noise_a", "noise_b", "target"]);

    let mut fixture = common::create_fixture_dataframe();
    let (_csv_dir, csv_path) = common::create_temp_csv(&mut fixture);
    assert_eq!(
        get_column_names(&csv_path).unwrap(),
        vec!["col_1", "col_2", "col_3", "target"]
    );
}

#[test]
fn test_full_schema_scan_sees_late_text_values() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("late_text.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "amount,code,target").unwrap();
    for i in 0..30 {
        writeln!(file, "{}.5,{},{}", i, i % 4, i % 2).unwrap();
    }
    writeln!(file, "30.5,A7,0").unwrap();
    drop(file);

    // 0 scans every row before choosing dtypes
    let (df, rows, _, _) = load_dataset_with_progress(&csv_path, 0).unwrap();
    assert_eq!(rows, 31);
    assert_eq!(df.column("code").unwrap().dtype(), &DataType::String);

    let (features, skipped) = partition_feature_columns(&df, &["target"]);
    assert_eq!(features, vec!["amount"]);
    assert_eq!(skipped, vec!["code"]);
}

#[test]
fn test_empty_cells_become_missing_features() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("gaps.csv");
    std::fs::write(&csv_path, "x1,x2,target\n1.0,,0\n,2.0,1\n3.0,4.0,0\n5.0,6.0,1\n").unwrap();

    let (df, _, _, _) = load_dataset_with_progress(&csv_path, 100).unwrap();
    let (features, _) = partition_feature_columns(&df, &["target"]);
    let x = FeatureMatrix::from_frame(&df, &features).unwrap();

    assert!(x.has_missing());
    assert!(x.get(0, 1).is_nan());
    assert!(x.get(1, 0).is_nan());
    assert_eq!(x.get(3, 1), 6.0);
}

#[test]
fn test_reduced_frame_round_trips_through_parquet() {
    let df = common::create_signal_dataframe(20);
    let mut reduced = df.select(["informative", "weak", "target"]).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("reduced.parquet");
    save_dataset(&mut reduced, &out).unwrap();

    let reloaded = load_dataset(&out, 100).unwrap().collect().unwrap();
    common::assert_shape(&reloaded, 20, 3);
    common::assert_has_columns(&reloaded, &["informative", "weak", "target"]);
    assert!(reloaded.equals(&reduced));
}

#[test]
fn test_reduced_frame_written_as_csv() {
    let df = common::create_fixture_dataframe();
    let mut reduced = df.select(["col_3", "target"]).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("reduced.CSV");
    save_dataset(&mut reduced, &out).unwrap();

    let contents = std::fs::read_to_string(&out).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("col_3,target"));
    assert_eq!(lines.count(), 8);

    // The source frame is untouched
    common::assert_shape(&df, 8, 4);
}

#[test]
fn test_unsupported_extensions_are_rejected() {
    let mut df = common::create_fixture_dataframe();
    let temp_dir = TempDir::new().unwrap();

    let input = temp_dir.path().join("data.xlsx");
    std::fs::write(&input, "not a spreadsheet").unwrap();
    match load_dataset(&input, 100) {
        Ok(_) => panic!("xlsx input should be rejected"),
        Err(err) => assert!(err.to_string().contains("Unsupported file format")),
    }
    assert!(get_column_names(&input).is_err());

    let err = save_dataset(&mut df, &temp_dir.path().join("out.json")).unwrap_err();
    assert!(err.to_string().contains("Unsupported output format"));
}

#[test]
fn test_missing_input_reports_path() {
    let err = load_dataset_with_progress(std::path::Path::new("/nonexistent/rfe_input.csv"), 100)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("rfe_input.csv"));
}
