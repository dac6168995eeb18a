//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use crate::pipeline::TargetMapping;
use crate::report::EliminationReport;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Pick the target column from the dataset columns
pub fn select_target(columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        anyhow::bail!("The dataset has no columns to choose a target from");
    }
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the target column")
        .items(columns)
        .default(0)
        .interact()?;
    Ok(columns[selection].clone())
}

/// Ask which values of a non-binary target are the event and the non-event
pub fn select_target_mapping(unique_values: &[String]) -> Result<TargetMapping> {
    if unique_values.len() < 2 {
        anyhow::bail!(
            "The target needs at least two distinct values, found {}",
            unique_values.len()
        );
    }

    let theme = ColorfulTheme::default();
    let event = Select::with_theme(&theme)
        .with_prompt("Select the EVENT value (maps to 1)")
        .items(unique_values)
        .default(0)
        .interact()?;

    let others: Vec<&String> = unique_values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != event)
        .map(|(_, v)| v)
        .collect();
    let non_event = Select::with_theme(&theme)
        .with_prompt("Select the NON-EVENT value (maps to 0)")
        .items(&others)
        .default(0)
        .interact()?;

    Ok(TargetMapping::new(
        unique_values[event].clone(),
        others[non_event].clone(),
    ))
}

/// Choose the feature count to keep; `None` means keep nothing and skip the export
pub fn select_feature_count(report: &EliminationReport) -> Result<Option<usize>> {
    let mut items: Vec<String> = report
        .rounds()
        .iter()
        .map(|r| {
            format!(
                "{:>4} features  (validation {:.4} ± {:.4})",
                r.num_features, r.val_metric_mean, r.val_metric_std
            )
        })
        .collect();
    items.push("Skip writing a reduced dataset".to_string());

    let default = report
        .best_round()
        .and_then(|best| report.rounds().iter().position(|r| r.round == best.round))
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("How many features should the reduced dataset keep?")
        .items(&items)
        .default(default)
        .interact()?;

    Ok(report.rounds().get(selection).map(|r| r.num_features))
}
