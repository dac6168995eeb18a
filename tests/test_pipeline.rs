//! Integration tests for the full load, eliminate and export pipeline

use shaprfe::pipeline::*;
use shaprfe::report::RunMetadata;
use shaprfe::DecisionTreeClassifier;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_full_pipeline_keeps_informative_feature() {
    let mut df = create_signal_dataframe(40);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);

    // Load
    let (df, rows, cols, _mem) = load_dataset_with_progress(&csv_path, 100).unwrap();
    assert_eq!((rows, cols), (40, 5));

    // Labels and features
    let (df, labels, dropped) = prepare_labels(df, "target", None).unwrap();
    assert_eq!(dropped, 0);
    let (features, skipped) = partition_feature_columns(&df, &["target"]);
    assert_eq!(features.len(), 4);
    assert!(skipped.is_empty());
    let x = FeatureMatrix::from_frame(&df, &features).unwrap();

    // Eliminate
    let mut rfe = ShapRfeCv::new(DecisionTreeClassifier::new().with_max_depth(3))
        .cv(4)
        .random_state(1);
    let report = rfe.fit_compute(&x, &labels).unwrap();
    assert_eq!(report.len(), 4);
    assert_eq!(rfe.get_reduced_features_set(1).unwrap(), vec!["informative"]);

    // Every round scores the informative feature perfectly on validation
    for round in report.rounds() {
        assert!((round.val_metric_mean - 1.0).abs() < 1e-12);
        assert_eq!(round.feature_importance[0].feature, "informative");
    }

    // Export the reduced dataset
    let mut kept = rfe.get_reduced_features_set(2).unwrap();
    kept.push("target".to_string());
    let mut reduced = df.select(kept).unwrap();
    let output_path = temp_dir.path().join("reduced.parquet");
    save_dataset(&mut reduced, &output_path).unwrap();

    let (reloaded, _, _, _) = load_dataset_with_progress(&output_path, 100).unwrap();
    assert_shape(&reloaded, 40, 3);
    assert_has_columns(&reloaded, &["informative", "target"]);
}

#[test]
fn test_pipeline_skips_string_columns() {
    let mut df = create_fixture_dataframe();
    df.with_column(polars::prelude::Column::new(
        "label".into(),
        ["a", "b", "a", "b", "a", "b", "a", "b"],
    ))
    .unwrap();

    let (features, skipped) = partition_feature_columns(&df, &["target"]);
    assert_eq!(features, vec!["col_1", "col_2", "col_3"]);
    assert_eq!(skipped, vec!["label"]);
}

#[test]
fn test_report_json_export() {
    let (x, y) = create_fixture();
    let mut rfe = ShapRfeCv::new(DecisionTreeClassifier::new().with_max_depth(1)).cv(2);
    rfe.fit(&x, &y).unwrap();

    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("report.json");
    let metadata: RunMetadata = rfe.metadata().unwrap().with_input("data.csv", "target");
    rfe.compute().unwrap().write_json(&path, &metadata).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["metadata"]["target_column"], "target");
    assert_eq!(json["metadata"]["estimator"], "DecisionTreeClassifier");
    assert_eq!(json["rounds"].as_array().unwrap().len(), 3);
    assert_eq!(json["rounds"][0]["num_features"], 3);
    assert_eq!(json["rounds"][2]["features_set"][0], "col_3");
}
