//! Elimination summary shown at the end of a CLI run

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::report::EliminationReport;

/// Summary of an elimination run
#[derive(Debug, Default)]
pub struct EliminationSummary {
    pub initial_features: usize,
    pub kept_features: usize,
    pub rounds: usize,
    pub best_round: Option<usize>,
    pub best_num_features: Option<usize>,
    pub best_val_score: Option<f64>,
    pub skipped_columns: Vec<String>,
    pub load_time: Duration,
    pub elimination_time: Duration,
}

impl EliminationSummary {
    pub fn new(initial_features: usize) -> Self {
        Self {
            initial_features,
            kept_features: initial_features,
            ..Default::default()
        }
    }

    pub fn set_report(&mut self, report: &EliminationReport) {
        self.rounds = report.len();
        if let Some(best) = report.best_round() {
            self.best_round = Some(best.round);
            self.best_num_features = Some(best.num_features);
            self.best_val_score = Some(best.val_metric_mean);
        }
    }

    pub fn set_kept_features(&mut self, kept: usize) {
        self.kept_features = kept;
    }

    pub fn set_skipped_columns(&mut self, skipped: Vec<String>) {
        self.skipped_columns = skipped;
    }

    pub fn set_load_time(&mut self, elapsed: Duration) {
        self.load_time = elapsed;
    }

    pub fn set_elimination_time(&mut self, elapsed: Duration) {
        self.elimination_time = elapsed;
    }

    pub fn reduction_pct(&self) -> f64 {
        if self.initial_features > 0 {
            (self.initial_features.saturating_sub(self.kept_features)) as f64
                / self.initial_features as f64
                * 100.0
        } else {
            0.0
        }
    }

    pub fn display(&self, scoring: &str) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("ELIMINATION SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Initial Features"),
            Cell::new(self.initial_features),
        ]);

        if !self.skipped_columns.is_empty() {
            table.add_row(vec![
                Cell::new("⏭️  Skipped (Non-numeric)"),
                Cell::new(self.skipped_columns.len()).fg(Color::Yellow),
            ]);
        }

        table.add_row(vec![Cell::new("🔁 Rounds"), Cell::new(self.rounds)]);

        if let (Some(round), Some(n), Some(score)) =
            (self.best_round, self.best_num_features, self.best_val_score)
        {
            table.add_row(vec![
                Cell::new(format!("🏆 Best Validation {}", scoring)),
                Cell::new(format!("{:.4} (round {}, {} features)", score, round, n))
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
            ]);
        }

        table.add_row(vec![
            Cell::new("✅ Kept Features"),
            Cell::new(self.kept_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        let reduction_pct = self.reduction_pct();
        let color = if reduction_pct > 30.0 {
            Color::Green
        } else if reduction_pct > 10.0 {
            Color::Yellow
        } else {
            Color::Cyan
        };

        table.add_row(vec![
            Cell::new("📉 Reduction"),
            Cell::new(format!("{:.1}%", reduction_pct))
                .fg(color)
                .add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("⏱️  Time"),
            Cell::new(format!(
                "load {:.2}s, elimination {:.2}s",
                self.load_time.as_secs_f64(),
                self.elimination_time.as_secs_f64()
            )),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.skipped_columns.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Skipped Columns").yellow(),
                style(format!("({})", self.skipped_columns.len())).dim()
            );
            for column in &self.skipped_columns {
                println!("        {} {}", style("•").dim(), column);
            }
        }
    }
}
