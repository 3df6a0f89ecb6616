//! CSV export of the backtest table joined with the signal column.

use crate::domain::error::TrendEdgeError;
use crate::domain::pipeline::BacktestReport;
use crate::domain::series::Position;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const HEADER: [&str; 7] = [
    "date",
    "price",
    "ret_buyhold",
    "ret_strategy",
    "eq_buyhold",
    "eq_strategy",
    "signal",
];

pub struct CsvReportAdapter;

/// `trendedge_<SYMBOL>_<fast>_<slow>.csv` inside `dir`.
pub fn default_output_path(dir: &Path, report: &BacktestReport) -> PathBuf {
    dir.join(format!(
        "trendedge_{}_{}_{}.csv",
        report.params.symbol, report.params.fast_window, report.params.slow_window
    ))
}

pub fn write_csv<W: Write>(report: &BacktestReport, writer: W) -> Result<(), TrendEdgeError> {
    let to_report_err = |e: csv::Error| TrendEdgeError::Report {
        reason: format!("CSV write error: {}", e),
    };

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER).map_err(to_report_err)?;

    for row in &report.table.rows {
        let signal = report
            .signal
            .get(row.date)
            .copied()
            .unwrap_or(Position::Flat);
        wtr.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.price.to_string(),
            row.ret_buyhold.to_string(),
            row.ret_strategy.to_string(),
            row.eq_buyhold.to_string(),
            row.eq_strategy.to_string(),
            signal.as_i32().to_string(),
        ])
        .map_err(to_report_err)?;
    }

    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), TrendEdgeError> {
        let file = std::fs::File::create(output_path).map_err(|e| TrendEdgeError::Report {
            reason: format!("failed to create {}: {}", output_path.display(), e),
        })?;
        write_csv(report, file)?;
        info!(path = %output_path.display(), rows = report.table.len(), "wrote csv report");
        Ok(())
    }
}
