//! Input coercion for the backtest engine.
//!
//! Upstream stages may hand over prices or signals in several shapes: an
//! already-indexed series, a multi-column table, a bare array, a scalar, or a
//! matrix. Everything is squeezed into a canonical one-dimensional,
//! date-indexed series here so the engine never inspects shapes itself.

use crate::domain::error::TrendEdgeError;
use crate::domain::series::{Position, PriceSeries, SignalSeries, TimeSeries};
use chrono::NaiveDate;

const SIGNAL_COLUMNS: &[&str] = &["signal"];
const PRICE_COLUMNS: &[&str] = &["adj close", "close", "price"];

/// A date-indexed table of named numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: Vec<NaiveDate>,
    columns: Vec<(String, Vec<f64>)>,
}

impl Table {
    pub fn new(
        index: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TrendEdgeError> {
        if columns.is_empty() {
            return Err(TrendEdgeError::Shape {
                expected: "at least one column".into(),
                actual: "a table with no columns".into(),
            });
        }
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != index.len()) {
            return Err(TrendEdgeError::Shape {
                expected: format!("{} rows in column '{}'", index.len(), name),
                actual: format!("{} rows", values.len()),
            });
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n.trim().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First preferred column present, otherwise the first column.
    fn primary_column(&self, preferred: &[&str]) -> &[f64] {
        preferred
            .iter()
            .find_map(|name| self.column(name))
            .unwrap_or(self.columns[0].1.as_slice())
    }
}

/// Loosely-shaped series input.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesInput {
    Indexed(TimeSeries<f64>),
    Table(Table),
    Array(Vec<f64>),
    Scalar(f64),
    /// Row-major `rows x cols` values.
    Matrix {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
}

impl From<TimeSeries<f64>> for SeriesInput {
    fn from(series: TimeSeries<f64>) -> Self {
        SeriesInput::Indexed(series)
    }
}

impl From<&SignalSeries> for SeriesInput {
    fn from(signal: &SignalSeries) -> Self {
        SeriesInput::Indexed(signal.map(|p| p.as_f64()))
    }
}

impl From<Table> for SeriesInput {
    fn from(table: Table) -> Self {
        SeriesInput::Table(table)
    }
}

impl From<Vec<f64>> for SeriesInput {
    fn from(values: Vec<f64>) -> Self {
        SeriesInput::Array(values)
    }
}

/// A one-dimensional input, after squeezing.
enum Squeezed {
    Indexed(TimeSeries<f64>),
    Table(Table),
    Array(Vec<f64>),
}

impl SeriesInput {
    /// Squeezes scalars and matrices with a unit dimension down to an array.
    fn squeeze(self) -> Result<Squeezed, TrendEdgeError> {
        match self {
            SeriesInput::Indexed(series) => Ok(Squeezed::Indexed(series)),
            SeriesInput::Table(table) => Ok(Squeezed::Table(table)),
            SeriesInput::Array(values) => Ok(Squeezed::Array(values)),
            SeriesInput::Scalar(value) => Ok(Squeezed::Array(vec![value])),
            SeriesInput::Matrix { rows, cols, values } => {
                if values.len() != rows * cols {
                    return Err(TrendEdgeError::Shape {
                        expected: format!("{} values for shape ({}, {})", rows * cols, rows, cols),
                        actual: format!("{} values", values.len()),
                    });
                }
                if rows == 1 || cols == 1 {
                    Ok(Squeezed::Array(values))
                } else {
                    Err(TrendEdgeError::Shape {
                        expected: "1-D data".into(),
                        actual: format!("shape ({}, {})", rows, cols),
                    })
                }
            }
        }
    }
}

/// Coerces a price input into a canonical price series. NaN rows are dropped.
pub fn coerce_prices(input: SeriesInput) -> Result<PriceSeries, TrendEdgeError> {
    match input.squeeze()? {
        Squeezed::Indexed(series) => {
            TimeSeries::prices(series.iter().map(|(d, p)| (d, *p)).filter(|(_, p)| !p.is_nan()))
        }
        Squeezed::Table(table) => {
            let column = table.primary_column(PRICE_COLUMNS);
            TimeSeries::prices(
                table
                    .index
                    .iter()
                    .copied()
                    .zip(column.iter().copied())
                    .filter(|(_, p)| !p.is_nan()),
            )
        }
        Squeezed::Array(values) => Err(TrendEdgeError::Shape {
            expected: "date-indexed price series".into(),
            actual: format!("array of {} values without a date index", values.len()),
        }),
    }
}

/// Coerces a signal input and aligns it onto `prices`' dates, filling gaps with flat.
pub fn coerce_signal(
    input: SeriesInput,
    prices: &PriceSeries,
) -> Result<SignalSeries, TrendEdgeError> {
    let signal = match input.squeeze()? {
        Squeezed::Indexed(series) => series.map(|v| Position::from_value(*v)),
        Squeezed::Table(table) => {
            let column = table.primary_column(SIGNAL_COLUMNS);
            TimeSeries::from_parts(
                table.index.clone(),
                column.iter().map(|v| Position::from_value(*v)).collect(),
            )?
        }
        Squeezed::Array(values) => right_align(&values, prices),
    };
    Ok(signal.reindex_like(prices, Position::Flat))
}

/// Places `values` against the most recent dates of `prices`. A shortfall is
/// treated as lookback at the start and padded flat; surplus leading values
/// are discarded.
fn right_align(values: &[f64], prices: &PriceSeries) -> SignalSeries {
    let n = prices.len();
    let tail = &values[values.len().saturating_sub(n)..];
    let pad = n - tail.len();

    let mut cursor = 0usize;
    prices.map(|_| {
        let pos = if cursor < pad {
            Position::Flat
        } else {
            Position::from_value(tail[cursor - pad])
        };
        cursor += 1;
        pos
    })
}
