//! ShapRFE: Feature Elimination CLI Tool
//!
//! Loads a dataset, runs recursive feature elimination with SHAP importance
//! and cross-validation, writes a JSON report and optionally a reduced dataset.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::*;

use shaprfe::cli::{self, Cli, ModelKind};
use shaprfe::model::{
    Classifier, DecisionTreeClassifier, HyperParams, MaxFeatures, ParamGrid,
    RandomForestClassifier, TreeParams,
};
use shaprfe::pipeline::{
    analyze_target_column, get_column_names, load_dataset_with_progress,
    partition_feature_columns, prepare_labels, save_dataset, FeatureMatrix, RandomizedSearchCv,
    Scorer, ShapRfeCv, Step, TargetAnalysis, TargetMapping,
};
use shaprfe::report::EliminationSummary;
use shaprfe::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    RunConfigView,
};

/// Prepared data handed to the elimination step
struct Prepared {
    df: DataFrame,
    target: String,
    features: FeatureMatrix,
    labels: Vec<u8>,
    summary: EliminationSummary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match (&cli.target, cli.no_confirm) {
        (Some(target), _) => target.clone(),
        (None, true) => anyhow::bail!(
            "Target column is required when using --no-confirm. Use -t/--target to specify."
        ),
        (None, false) => {
            let columns = get_column_names(&cli.input)?;
            cli::select_target(&columns)?
        }
    };

    // Fail fast on settings the library would reject after loading
    let step: Step = cli.step.parse()?;
    let scoring: Scorer = cli.scoring.parse()?;
    let tree_params = tree_params(&cli)?;

    print_banner(env!("CARGO_PKG_VERSION"));
    let model_label = match cli.model {
        ModelKind::Tree => "decision tree".to_string(),
        ModelKind::Forest => format!("random forest ({} trees)", cli.n_estimators),
    };
    let step_label = step.to_string();
    print_config(&RunConfigView {
        input: &cli.input,
        target: &target,
        model: &model_label,
        scoring: scoring.name(),
        step: &step_label,
        cv: cli.cv,
        min_features: cli.min_features,
    });

    if !cli.no_confirm && !cli::confirm_step("Start feature elimination with these settings?")? {
        print_info("Cancelled");
        return Ok(());
    }

    let prepared = prepare_data(&cli, target)?;

    match cli.model {
        ModelKind::Tree => {
            let estimator = DecisionTreeClassifier::new().with_tree_params(tree_params);
            run_elimination(&cli, estimator, step, scoring, prepared)
        }
        ModelKind::Forest => {
            let estimator = RandomForestClassifier::new()
                .with_n_estimators(cli.n_estimators)
                .with_tree_params(tree_params);
            run_elimination(&cli, estimator, step, scoring, prepared)
        }
    }
}

fn tree_params(cli: &Cli) -> Result<TreeParams> {
    let default_max_features = match cli.model {
        ModelKind::Tree => MaxFeatures::All,
        ModelKind::Forest => MaxFeatures::Sqrt,
    };
    let max_features = match &cli.max_features {
        Some(s) => s.parse()?,
        None => default_max_features,
    };

    let params = TreeParams {
        criterion: cli.criterion.parse()?,
        max_depth: cli.max_depth,
        min_samples_split: cli.min_samples_split,
        min_samples_leaf: cli.min_samples_leaf,
        max_features,
    };
    params.validate()?;
    Ok(params)
}

/// Load the dataset, resolve labels and build the feature matrix
fn prepare_data(cli: &Cli, target: String) -> Result<Prepared> {
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    println!();
    let (mut df, rows, cols, memory_mb) =
        load_dataset_with_progress(&cli.input, cli.infer_schema_length)?;
    print_success("Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    if !cli.drop_columns.is_empty() {
        let present: Vec<String> = cli
            .drop_columns
            .iter()
            .filter(|c| df.get_column_index(c).is_some())
            .cloned()
            .collect();
        df = df.drop_many(&present);
        print_count("column(s) dropped on request", present.len(), None);
    }

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    if !column_names.contains(&target) {
        anyhow::bail!(
            "Target column '{}' not found in dataset. Available columns: {:?}",
            target,
            column_names
        );
    }
    let load_elapsed = step_start.elapsed();
    print_step_time(load_elapsed);

    print_step_header(2, "Target & Features");
    let mapping = match (&cli.event_value, &cli.non_event_value) {
        (Some(event), Some(non_event)) => Some(TargetMapping::new(event, non_event)),
        _ => match analyze_target_column(&df, &target)? {
            TargetAnalysis::NeedsMapping { unique_values } if !cli.no_confirm => {
                print_info("Target is not binary 0/1; choose the event and non-event values");
                Some(cli::select_target_mapping(&unique_values)?)
            }
            _ => None,
        },
    };

    let (df, labels, dropped_rows) = prepare_labels(df, &target, mapping.as_ref())?;
    if dropped_rows > 0 {
        print_count(
            "row(s) with unmapped target values",
            dropped_rows,
            Some("(removed)"),
        );
    }
    let events = labels.iter().filter(|&&l| l == 1).count();
    print_info(&format!(
        "Target '{}': {} events / {} non-events",
        target,
        events,
        labels.len() - events
    ));

    let (feature_names, skipped) = partition_feature_columns(&df, &[target.as_str()]);
    if !skipped.is_empty() {
        print_info(&format!(
            "Skipping {} non-numeric column(s): {}",
            skipped.len(),
            skipped.join(", ")
        ));
    }
    if feature_names.is_empty() {
        anyhow::bail!("No numeric feature columns left to eliminate from");
    }

    let features = FeatureMatrix::from_frame(&df, &feature_names)
        .context("Failed to build the feature matrix")?;
    print_success(&format!("{} numeric features ready", features.n_features()));

    let mut summary = EliminationSummary::new(features.n_features());
    summary.set_skipped_columns(skipped);
    summary.set_load_time(load_elapsed);

    Ok(Prepared {
        df,
        target,
        features,
        labels,
        summary,
    })
}

fn run_elimination<E: Classifier + HyperParams>(
    cli: &Cli,
    estimator: E,
    step: Step,
    scoring: Scorer,
    prepared: Prepared,
) -> Result<()> {
    let Prepared {
        df,
        target,
        features,
        labels,
        mut summary,
    } = prepared;

    let mut rfe = match &cli.search_grid {
        Some(grid) => {
            let grid: ParamGrid = grid.parse()?;
            let mut search = RandomizedSearchCv::new(estimator, grid)
                .n_iter(cli.search_iter)
                .cv(cli.search_cv)
                .scoring(scoring);
            if let Some(seed) = cli.random_state {
                search = search.random_state(seed);
            }
            ShapRfeCv::with_search(search)
        }
        None => ShapRfeCv::new(estimator),
    }
    .step(step)
    .min_features_to_select(cli.min_features)
    .cv(cli.cv)
    .scoring(scoring)
    .n_jobs(cli.n_jobs)
    .verbose(cli.verbose);
    if let Some(seed) = cli.random_state {
        rfe = rfe.random_state(seed);
    }

    print_step_header(3, "SHAP Recursive Feature Elimination");
    let step_start = Instant::now();
    // Round output would interleave with a spinner
    let spinner = (cli.verbose <= 50).then(|| create_spinner("Eliminating features..."));
    let fit_result = rfe.fit(&features, &labels).map(|_| ());
    if let Some(spinner) = &spinner {
        match &fit_result {
            Ok(()) => finish_with_success(spinner, "Elimination complete"),
            Err(_) => finish_with_warning(spinner, "Elimination failed"),
        }
    }
    fit_result?;
    let elimination_elapsed = step_start.elapsed();
    print_step_time(elimination_elapsed);

    let report = rfe.compute()?.clone();
    report.display(scoring.name());

    let report_path = cli.report_path();
    let metadata = rfe
        .metadata()?
        .with_input(cli.input.display().to_string(), target.clone());
    report
        .write_json(&report_path, &metadata)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    print_success(&format!("Report saved to {}", report_path.display()));

    if cli.plot {
        rfe.plot(true)?;
    }

    print_step_header(4, "Save Results");
    let keep = match cli.keep_features {
        Some(n) => Some(n),
        None if !cli.no_confirm => cli::select_feature_count(&report)?,
        None => None,
    };

    summary.set_report(&report);
    summary.set_elimination_time(elimination_elapsed);

    match keep {
        Some(n) => {
            let mut kept = rfe.get_reduced_features_set(n)?;
            summary.set_kept_features(kept.len());
            kept.push(target);

            let output_path = cli.output_path();
            let spinner = create_spinner("Writing output file...");
            let mut reduced = df.select(kept)?;
            save_dataset(&mut reduced, &output_path)?;
            finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));
        }
        None => {
            print_info("No reduced dataset written (use --keep-features N to export one)");
        }
    }

    summary.display(scoring.name());
    print_completion();
    Ok(())
}
