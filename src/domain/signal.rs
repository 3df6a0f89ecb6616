//! Moving-average crossover signal.
//!
//! Long when SMA(fast) > SMA(slow), flat otherwise. Dates where either
//! average is still warming up are flat.

use crate::domain::indicator::simple_moving_average;
use crate::domain::series::{Position, PriceSeries, SignalSeries};

pub fn generate_signal(prices: &PriceSeries, fast_window: usize, slow_window: usize) -> SignalSeries {
    let fast = simple_moving_average(prices, fast_window);
    let slow = simple_moving_average(prices, slow_window);

    let mut slow_values = slow.values().iter();
    fast.map(|f| match (*f, slow_values.next().copied().flatten()) {
        (Some(f), Some(s)) if f > s => Position::Long,
        _ => Position::Flat,
    })
}
