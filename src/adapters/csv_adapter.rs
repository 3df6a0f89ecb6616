//! CSV file price source.
//!
//! Reads `<SYMBOL>.csv` files in the market-data download layout
//! (`Date,Open,High,Low,Close,Adj Close,Volume`). "Adj Close" is preferred
//! over "Close"; rows whose close is not a positive number are dropped.
//! File stems match symbols case-insensitively and are listed normalized.

use crate::domain::error::TrendEdgeError;
use crate::domain::params::normalize_symbol;
use crate::domain::series::{PriceSeries, TimeSeries};
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CLOSE_COLUMNS: &[&str] = &["adj close", "adj_close", "close"];

pub struct CsvPriceSource {
    base_path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// `<symbol>.csv`, or the first `.csv` whose stem matches ignoring case.
    fn csv_path(&self, symbol: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{}.csv", symbol));
        if exact.is_file() {
            return exact;
        }
        fs::read_dir(&self.base_path)
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|path| {
                csv_stem(path).is_some_and(|stem| stem.eq_ignore_ascii_case(symbol))
            })
            .unwrap_or(exact)
    }
}

fn csv_stem(path: &Path) -> Option<String> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().to_string())
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Timestamps such as "2024-01-02 00:00:00-05:00" keep only the date part.
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl PriceSource for CsvPriceSource {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TrendEdgeError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TrendEdgeError::NoData {
                symbol: symbol.to_string(),
                reason: format!("no price file at {}", path.display()),
            },
            _ => TrendEdgeError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| TrendEdgeError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;

        let date_col = find_column(headers, &["date", "datetime"]).unwrap_or(0);
        let close_col =
            find_column(headers, CLOSE_COLUMNS).ok_or_else(|| TrendEdgeError::NoData {
                symbol: symbol.to_string(),
                reason: "no Close or Adj Close column".into(),
            })?;

        let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
        let mut dropped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| TrendEdgeError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw_date = record.get(date_col).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| TrendEdgeError::DataSource {
                reason: format!("invalid date '{}' in {}", raw_date, path.display()),
            })?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            match record.get(close_col).and_then(|v| v.trim().parse::<f64>().ok()) {
                Some(close) if close.is_finite() && close > 0.0 => rows.push((date, close)),
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(symbol, dropped, "dropped rows without a usable close");
        }

        rows.sort_by_key(|(date, _)| *date);
        debug!(symbol, bars = rows.len(), "loaded prices from csv");
        TimeSeries::prices(rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendEdgeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TrendEdgeError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| TrendEdgeError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            if let Some(stem) = csv_stem(&entry.path()) {
                symbols.push(normalize_symbol(&stem));
            }
        }

        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}
