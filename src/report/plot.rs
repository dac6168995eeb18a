//! Score versus number of features chart using ratatui
//!
//! The chart can be rendered headless into a text grid or shown full screen
//! until a key is pressed.

use std::io::stdout;

use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    buffer::Buffer,
    prelude::*,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use crate::error::Result;
use crate::report::EliminationReport;

/// Train and validation score curves of a fitted elimination
#[derive(Debug, Clone)]
pub struct PlotHandle {
    title: String,
    y_label: String,
    train: Vec<(f64, f64)>,
    validation: Vec<(f64, f64)>,
}

impl PlotHandle {
    pub fn new(report: &EliminationReport, scoring: &str) -> Self {
        let points = |f: fn(&crate::report::RoundRecord) -> f64| -> Vec<(f64, f64)> {
            report
                .rounds()
                .iter()
                .map(|r| (r.num_features as f64, f(r)))
                .collect()
        };

        Self {
            title: "Backwards Feature Elimination using SHAP & CV".to_string(),
            y_label: format!("Performance {}", scoring),
            train: points(|r| r.train_metric_mean),
            validation: points(|r| r.val_metric_mean),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn train_points(&self) -> &[(f64, f64)] {
        &self.train
    }

    pub fn validation_points(&self) -> &[(f64, f64)] {
        &self.validation
    }

    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let all = self.train.iter().chain(&self.validation);
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in all.filter(|(_, y)| y.is_finite()) {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if !x_min.is_finite() {
            return ([0.0, 1.0], [0.0, 1.0]);
        }
        if x_max - x_min < 1.0 {
            x_max = x_min + 1.0;
        }
        let pad = ((y_max - y_min) * 0.1).max(0.01);
        ([x_min, x_max], [y_min - pad, y_max + pad])
    }

    /// Build the ratatui chart widget
    pub fn chart(&self) -> Chart<'_> {
        let (x_bounds, y_bounds) = self.bounds();

        let datasets = vec![
            Dataset::default()
                .name("Train Score")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Cyan))
                .data(&self.train),
            Dataset::default()
                .name("Validation Score")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Magenta))
                .data(&self.validation),
        ];

        let x_labels = vec![
            Span::raw(format!("{:.0}", x_bounds[0])),
            Span::raw(format!("{:.0}", (x_bounds[0] + x_bounds[1]) / 2.0)),
            Span::raw(format!("{:.0}", x_bounds[1])),
        ];
        let y_labels = vec![
            Span::raw(format!("{:.3}", y_bounds[0])),
            Span::raw(format!("{:.3}", (y_bounds[0] + y_bounds[1]) / 2.0)),
            Span::raw(format!("{:.3}", y_bounds[1])),
        ];

        Chart::new(datasets)
            .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
            .block(
                Block::default()
                    .title(self.title.as_str())
                    .borders(Borders::ALL),
            )
            .x_axis(
                Axis::default()
                    .title("Number of features")
                    .style(Style::default().fg(Color::Gray))
                    .bounds(x_bounds)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(self.y_label.as_str())
                    .style(Style::default().fg(Color::Gray))
                    .bounds(y_bounds)
                    .labels(y_labels),
            )
    }

    /// Render the chart without a terminal, one string line per row
    pub fn render_to_string(&self, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        self.chart().render(area, &mut buf);

        (0..height)
            .map(|y| {
                let line: String = (0..width).map(|x| buf[(x, y)].symbol()).collect();
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Show the chart full screen until a key is pressed
    pub fn show(&self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let result = self.show_loop();
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        result
    }

    fn show_loop(&self) -> Result<()> {
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        loop {
            terminal.draw(|frame| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(5), Constraint::Length(1)])
                    .split(frame.area());
                frame.render_widget(self.chart(), chunks[0]);
                frame.render_widget(
                    Paragraph::new("Press any key to close").style(Style::default().fg(Color::DarkGray)),
                    chunks[1],
                );
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}
