//! Configuration validation.
//!
//! Validates config file fields before any backtest runs. Every key is
//! optional; present keys must be well formed.

use crate::domain::error::TrendEdgeError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendEdgeError> {
    validate_window(config, "fast_window")?;
    validate_window(config, "slow_window")?;
    validate_periods_per_year(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_cache_ttl(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TrendEdgeError {
    TrendEdgeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_window(config: &dyn ConfigPort, key: &str) -> Result<(), TrendEdgeError> {
    if let Some(raw) = config.get_string("backtest", key) {
        match raw.trim().parse::<i64>() {
            Ok(v) if v >= 1 => {}
            _ => return Err(invalid("backtest", key, "must be a positive integer")),
        }
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), TrendEdgeError> {
    let value = config.get_int("backtest", "periods_per_year", 252);
    if value <= 0 {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TrendEdgeError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TrendEdgeError> {
    let start = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// Empty values count as absent.
pub fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, TrendEdgeError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    field,
                    &format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn validate_cache_ttl(config: &dyn ConfigPort) -> Result<(), TrendEdgeError> {
    let value = config.get_int("data", "cache_ttl_secs", 0);
    if value < 0 {
        return Err(invalid(
            "data",
            "cache_ttl_secs",
            "cache_ttl_secs must be non-negative",
        ));
    }
    Ok(())
}
