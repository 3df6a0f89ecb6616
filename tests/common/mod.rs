#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::Cell;
use std::collections::HashMap;
use trendedge::domain::error::TrendEdgeError;
use trendedge::domain::series::{Position, PriceSeries, SignalSeries, TimeSeries};
use trendedge::ports::data_port::PriceSource;

pub struct MockPriceSource {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: PriceSeries) -> Self {
        self.data.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TrendEdgeError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TrendEdgeError::DataSource {
                reason: reason.clone(),
            });
        }
        let Some(series) = self.data.get(symbol) else {
            return Ok(PriceSeries::empty());
        };
        TimeSeries::prices(
            series
                .iter()
                .filter(|(d, _)| start_date.is_none_or(|s| *d >= s))
                .filter(|(d, _)| end_date.is_none_or(|e| *d <= e))
                .map(|(d, p)| (d, *p)),
        )
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendEdgeError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from 2024-01-01.
pub fn make_dates(count: usize) -> Vec<NaiveDate> {
    let start = date(2024, 1, 1);
    (0..count)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

pub fn make_prices(prices: &[f64]) -> PriceSeries {
    TimeSeries::prices(make_dates(prices.len()).into_iter().zip(prices.iter().copied())).unwrap()
}

pub fn make_signal(dates: &[NaiveDate], signal: &[i32]) -> SignalSeries {
    TimeSeries::from_parts(
        dates.to_vec(),
        signal.iter().map(|&s| Position::from_value(s as f64)).collect(),
    )
    .unwrap()
}

/// A gently trending series with a deterministic wobble.
pub fn wavy_prices(count: usize) -> PriceSeries {
    let values: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 5.0 * (t / 9.0).sin()
        })
        .collect();
    make_prices(&values)
}

pub fn price_csv(prices: &PriceSeries) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for (d, p) in prices.iter() {
        out.push_str(&format!("{},{p},{p},{p},{p},{p},1000\n", d.format("%Y-%m-%d")));
    }
    out
}
