//! Benchmark TreeSHAP explanations for single trees and forests
//!
//! Run with: cargo bench --bench shap_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use shaprfe::{Classifier, DecisionTreeClassifier, FeatureMatrix, RandomForestClassifier};

/// Generate a dataset where the first few features drive the label
fn generate_dataset(n_rows: usize, n_features: usize, seed: u64) -> (FeatureMatrix, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..n_features).map(|i| format!("feature_{}", i)).collect();

    let mut rows = Vec::with_capacity(n_rows);
    let mut labels = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let row: Vec<f64> = (0..n_features).map(|_| rng.gen::<f64>()).collect();
        let signal: f64 = row.iter().take(3).sum::<f64>() + rng.gen::<f64>() * 0.5;
        labels.push(u8::from(signal > 1.75));
        rows.push(row);
    }

    let x = FeatureMatrix::from_rows(&names, &rows).expect("Failed to build feature matrix");
    (x, labels)
}

/// TreeSHAP cost grows with tree depth
fn benchmark_tree_shap_by_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_shap_by_depth");
    group.sample_size(30);

    let (x, y) = generate_dataset(2_000, 20, 42);
    group.throughput(Throughput::Elements(x.n_rows() as u64));

    for depth in [2, 4, 6, 8] {
        let mut clf = DecisionTreeClassifier::new()
            .with_max_depth(depth)
            .with_random_state(0);
        clf.fit(&x, &y).expect("Failed to fit tree");

        group.bench_with_input(BenchmarkId::from_parameter(depth), &clf, |b, clf| {
            b.iter(|| clf.shap_values(black_box(&x)));
        });
    }

    group.finish();
}

/// Forest explanations scale with the number of trees
fn benchmark_forest_shap_by_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_shap_by_trees");
    group.sample_size(10);

    let (x, y) = generate_dataset(1_000, 20, 42);

    for n_trees in [10, 50, 100] {
        let mut forest = RandomForestClassifier::new()
            .with_n_estimators(n_trees)
            .with_max_depth(6)
            .with_random_state(0);
        forest.fit(&x, &y).expect("Failed to fit forest");

        group.throughput(Throughput::Elements((x.n_rows() * n_trees) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), &forest, |b, forest| {
            b.iter(|| forest.shap_values(black_box(&x)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tree_shap_by_depth,
    benchmark_forest_shap_by_trees
);
criterion_main!(benches);
