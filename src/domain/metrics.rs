//! Performance metrics.
//!
//! Every reduction returns `None` when the statistic is undefined for the
//! input (too few observations, zero variance) so that "no result" never
//! masquerades as a zero.
//!
//! Sharpe uses the sample standard deviation (n - 1 denominator).

use crate::domain::backtest::BacktestTable;

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Annualisation inputs for CAGR and Sharpe.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub periods_per_year: u32,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            periods_per_year: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

/// `equity[last]^(periods_per_year / n) - 1`. Assumes the curve starts at 1.
pub fn cagr(equity: &[f64], periods_per_year: u32) -> Option<f64> {
    let n = equity.len();
    if n < 2 {
        return None;
    }
    let last = *equity.last()?;
    Some(last.powf(periods_per_year as f64 / n as f64) - 1.0)
}

pub fn sharpe(returns: &[f64], periods_per_year: u32, risk_free_rate: f64) -> Option<f64> {
    let n = returns.len();
    if n < 2 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / n as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let stddev = variance.sqrt();

    if stddev == 0.0 || !stddev.is_finite() {
        return None;
    }

    let ppy = periods_per_year as f64;
    Some((mean - risk_free_rate / ppy) / stddev * ppy.sqrt())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawdown {
    /// Deepest drawdown, always <= 0.
    pub max: f64,
    pub series: Vec<f64>,
}

pub fn max_drawdown(equity: &[f64]) -> Option<Drawdown> {
    if equity.is_empty() {
        return None;
    }

    let mut peak = f64::NEG_INFINITY;
    let series: Vec<f64> = equity
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            value / peak - 1.0
        })
        .collect();

    let max = series.iter().copied().fold(0.0_f64, f64::min);
    Some(Drawdown { max, series })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return_strategy: Option<f64>,
    pub total_return_buyhold: Option<f64>,
    pub cagr_strategy: Option<f64>,
    pub cagr_buyhold: Option<f64>,
    pub sharpe_strategy: Option<f64>,
    pub sharpe_buyhold: Option<f64>,
    pub max_drawdown_strategy: Option<f64>,
    pub max_drawdown_buyhold: Option<f64>,
    /// Fraction of days a long position was held.
    pub exposure: Option<f64>,
}

impl Metrics {
    pub fn compute(table: &BacktestTable, config: &BacktestConfig) -> Self {
        let eq_strategy = table.strategy_equity();
        let eq_buyhold = table.buyhold_equity();
        let ppy = config.periods_per_year;
        let rf = config.risk_free_rate;

        let exposure = if table.is_empty() {
            None
        } else {
            let held = table.rows.iter().filter(|r| r.held.is_long()).count();
            Some(held as f64 / table.len() as f64)
        };

        Metrics {
            total_return_strategy: eq_strategy.last().map(|e| e - 1.0),
            total_return_buyhold: eq_buyhold.last().map(|e| e - 1.0),
            cagr_strategy: cagr(&eq_strategy, ppy),
            cagr_buyhold: cagr(&eq_buyhold, ppy),
            sharpe_strategy: sharpe(&table.strategy_returns(), ppy, rf),
            sharpe_buyhold: sharpe(&table.buyhold_returns(), ppy, rf),
            max_drawdown_strategy: max_drawdown(&eq_strategy).map(|d| d.max),
            max_drawdown_buyhold: max_drawdown(&eq_buyhold).map(|d| d.max),
            exposure,
        }
    }
}
