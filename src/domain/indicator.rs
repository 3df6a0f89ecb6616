//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) observations are undefined (`None`).

use crate::domain::series::{PriceSeries, TimeSeries};

pub type IndicatorSeries = TimeSeries<Option<f64>>;

pub fn simple_moving_average(prices: &PriceSeries, period: usize) -> IndicatorSeries {
    let values = prices.values();
    let mut seen = 0usize;

    prices.map(|_| {
        seen += 1;
        (period > 0 && seen >= period)
            .then(|| values[seen - period..seen].iter().sum::<f64>() / period as f64)
    })
}
