//! Backtest engine.
//!
//! Turns a price series and a position series into daily returns and
//! cumulative equity for the strategy and for buy-and-hold. The position held
//! on day t is the signal computed on day t-1 (next-day execution); before the
//! first date the position is flat.

use crate::domain::coerce::{coerce_prices, coerce_signal, SeriesInput};
use crate::domain::error::TrendEdgeError;
use crate::domain::series::{Position, PriceSeries, SignalSeries};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub price: f64,
    pub ret_buyhold: f64,
    pub ret_strategy: f64,
    pub eq_buyhold: f64,
    pub eq_strategy: f64,
    /// Position held during this day (the previous day's signal).
    pub held: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestTable {
    pub rows: Vec<BacktestRow>,
}

impl BacktestTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn buyhold_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ret_buyhold).collect()
    }

    pub fn strategy_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ret_strategy).collect()
    }

    pub fn buyhold_equity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.eq_buyhold).collect()
    }

    pub fn strategy_equity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.eq_strategy).collect()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&BacktestRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }
}

pub fn run_backtest(prices: &PriceSeries, signal: &SignalSeries) -> BacktestTable {
    let signal = signal.reindex_like(prices, Position::Flat);
    let returns = prices.pct_change();

    let mut rows = Vec::with_capacity(prices.len());
    let mut held = Position::Flat;
    let mut eq_buyhold = 1.0;
    let mut eq_strategy = 1.0;

    for (i, (date, &price)) in prices.iter().enumerate() {
        let ret_buyhold = returns[i];
        let ret_strategy = ret_buyhold * held.as_f64();
        eq_buyhold *= 1.0 + ret_buyhold;
        eq_strategy *= 1.0 + ret_strategy;

        rows.push(BacktestRow {
            date,
            price,
            ret_buyhold,
            ret_strategy,
            eq_buyhold,
            eq_strategy,
            held,
        });

        held = signal.values()[i];
    }

    BacktestTable { rows }
}

/// Coerces loosely-shaped inputs before running the backtest.
pub fn run_backtest_raw(
    prices: SeriesInput,
    signal: SeriesInput,
) -> Result<BacktestTable, TrendEdgeError> {
    let prices = coerce_prices(prices)?;
    let signal = coerce_signal(signal, &prices)?;
    Ok(run_backtest(&prices, &signal))
}
