//! Report module - elimination results, summaries and charts

pub mod elimination_report;
pub mod plot;
pub mod summary;

pub use elimination_report::*;
pub use plot::PlotHandle;
pub use summary::*;
