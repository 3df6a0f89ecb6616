//! Report generation port trait.

use crate::domain::error::TrendEdgeError;
use crate::domain::pipeline::BacktestReport;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), TrendEdgeError>;
}
