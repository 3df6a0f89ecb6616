//! Backtest request parameters and their validation.
//!
//! Validation collects every problem rather than stopping at the first one,
//! so callers can show the full list.

use crate::domain::error::TrendEdgeError;
use chrono::NaiveDate;

pub const MAX_SLOW_WINDOW: usize = 500;

/// Extra observations required beyond the slow window before a run is attempted.
pub const HISTORY_MARGIN: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestParams {
    pub symbol: String,
    pub fast_window: usize,
    pub slow_window: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BacktestParams {
    pub fn new(symbol: &str, fast_window: usize, slow_window: usize) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            fast_window,
            slow_window,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.symbol.is_empty() {
            messages.push("Symbol must not be empty.".to_string());
        }
        messages.extend(validate_windows(self.fast_window, self.slow_window));
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start >= end {
                messages.push("Start date must be before end date.".to_string());
            }
        }
        messages
    }

    pub fn validate(&self) -> Result<(), TrendEdgeError> {
        let messages = self.messages();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(TrendEdgeError::InvalidParameters { messages })
        }
    }

    pub fn minimum_history(&self) -> usize {
        minimum_history(self.fast_window, self.slow_window)
    }

    pub fn check_history(&self, bars: usize) -> Result<(), TrendEdgeError> {
        let minimum = self.minimum_history();
        if bars < minimum {
            return Err(TrendEdgeError::InsufficientData {
                symbol: self.symbol.clone(),
                bars,
                minimum,
            });
        }
        Ok(())
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub fn validate_windows(fast_window: usize, slow_window: usize) -> Vec<String> {
    let mut messages = Vec::new();
    if fast_window < 1 || slow_window < 1 {
        messages.push("MA window lengths must be positive integers.".to_string());
    }
    if fast_window >= slow_window {
        messages.push("Fast MA must be strictly smaller than Slow MA.".to_string());
    }
    if slow_window > MAX_SLOW_WINDOW {
        messages.push(format!(
            "Slow MA is too large (>{}) for most symbols.",
            MAX_SLOW_WINDOW
        ));
    }
    messages
}

pub fn minimum_history(fast_window: usize, slow_window: usize) -> usize {
    fast_window.max(slow_window) + HISTORY_MARGIN
}
