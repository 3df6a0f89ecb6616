//! Core domain types and logic.

pub mod series;
pub mod indicator;
pub mod signal;
pub mod coerce;
pub mod backtest;
pub mod metrics;
pub mod params;
pub mod pipeline;
pub mod research;
pub mod config_validation;
pub mod error;
