//! End-to-end backtest run: validate, fetch, signal, backtest, metrics.

use crate::domain::backtest::{run_backtest, BacktestTable};
use crate::domain::error::TrendEdgeError;
use crate::domain::indicator::{simple_moving_average, IndicatorSeries};
use crate::domain::metrics::{BacktestConfig, Metrics};
use crate::domain::params::BacktestParams;
use crate::domain::series::{Position, PriceSeries, SignalSeries};
use crate::domain::signal::generate_signal;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub params: BacktestParams,
    pub config: BacktestConfig,
    pub prices: PriceSeries,
    pub fast_ma: IndicatorSeries,
    pub slow_ma: IndicatorSeries,
    pub signal: SignalSeries,
    pub table: BacktestTable,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow {
    pub date: NaiveDate,
    pub price: f64,
    pub fast_ma: f64,
    pub slow_ma: f64,
    pub signal: Position,
}

impl BacktestReport {
    /// The last `limit` dates on which both averages are defined.
    pub fn signal_preview(&self, limit: usize) -> Vec<PreviewRow> {
        let rows: Vec<PreviewRow> = self
            .prices
            .iter()
            .zip(self.fast_ma.values())
            .zip(self.slow_ma.values())
            .zip(self.signal.values())
            .filter_map(|((((date, &price), fast), slow), &signal)| {
                Some(PreviewRow {
                    date,
                    price,
                    fast_ma: (*fast)?,
                    slow_ma: (*slow)?,
                    signal,
                })
            })
            .collect();

        let start = rows.len().saturating_sub(limit);
        rows[start..].to_vec()
    }
}

/// Runs the core pipeline over an already-fetched price series.
pub fn run_on_prices(
    params: &BacktestParams,
    config: &BacktestConfig,
    prices: PriceSeries,
) -> Result<BacktestReport, TrendEdgeError> {
    params.validate()?;

    if prices.is_empty() {
        return Err(TrendEdgeError::NoData {
            symbol: params.symbol.clone(),
            reason: "empty price series (check symbol and dates)".into(),
        });
    }
    params.check_history(prices.len())?;

    let fast_ma = simple_moving_average(&prices, params.fast_window);
    let slow_ma = simple_moving_average(&prices, params.slow_window);
    let signal = generate_signal(&prices, params.fast_window, params.slow_window);
    debug!(
        long_days = signal.values().iter().filter(|p| p.is_long()).count(),
        "signal generated"
    );

    let table = run_backtest(&prices, &signal);
    let metrics = Metrics::compute(&table, config);

    Ok(BacktestReport {
        params: params.clone(),
        config: config.clone(),
        prices,
        fast_ma,
        slow_ma,
        signal,
        table,
        metrics,
    })
}

pub fn run_pipeline(
    source: &dyn PriceSource,
    params: &BacktestParams,
    config: &BacktestConfig,
) -> Result<BacktestReport, TrendEdgeError> {
    params.validate()?;

    info!(
        symbol = %params.symbol,
        fast = params.fast_window,
        slow = params.slow_window,
        "fetching prices"
    );
    let prices = source
        .fetch_prices(&params.symbol, params.start_date, params.end_date)
        .map_err(|e| match e {
            TrendEdgeError::DataSource { reason } | TrendEdgeError::InvalidSeries { reason } => {
                TrendEdgeError::NoData {
                    symbol: params.symbol.clone(),
                    reason,
                }
            }
            other => other,
        })?;

    info!(
        symbol = %params.symbol,
        bars = prices.len(),
        first = ?prices.first_date(),
        last = ?prices.last_date(),
        "running backtest"
    );
    run_on_prices(params, config, prices)
}
