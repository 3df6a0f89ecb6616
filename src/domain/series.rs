//! Date-indexed time series.
//!
//! `TimeSeries<T>` keeps a strictly increasing `NaiveDate` index alongside a
//! parallel value vector. Point lookup is a binary search over the index and
//! `reindex_like` aligns one series onto another's dates, filling gaps with a
//! caller-supplied default.

use crate::domain::error::TrendEdgeError;
use chrono::NaiveDate;

/// Strategy position for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    #[default]
    Flat,
    Long,
}

impl Position {
    /// Any strictly positive value is long; zero, negatives and NaN are flat.
    pub fn from_value(value: f64) -> Self {
        if value > 0.0 {
            Position::Long
        } else {
            Position::Flat
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_i32() as f64
    }

    pub fn is_long(self) -> bool {
        self == Position::Long
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    index: Vec<NaiveDate>,
    values: Vec<T>,
}

pub type PriceSeries = TimeSeries<f64>;
pub type SignalSeries = TimeSeries<Position>;

impl<T> TimeSeries<T> {
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn from_parts(index: Vec<NaiveDate>, values: Vec<T>) -> Result<Self, TrendEdgeError> {
        if index.len() != values.len() {
            return Err(TrendEdgeError::Shape {
                expected: format!("{} values for {} dates", index.len(), index.len()),
                actual: format!("{} values", values.len()),
            });
        }
        if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
            let reason = if pair[0] == pair[1] {
                format!("duplicate date {}", pair[1])
            } else {
                format!("date {} follows {}", pair[1], pair[0])
            };
            return Err(TrendEdgeError::InvalidSeries { reason });
        }
        Ok(Self { index, values })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, TrendEdgeError>
    where
        I: IntoIterator<Item = (NaiveDate, T)>,
    {
        let (index, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::from_parts(index, values)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &T)> + '_ {
        self.index.iter().copied().zip(self.values.iter())
    }

    /// O(log n) lookup by date.
    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        self.index
            .binary_search(&date)
            .ok()
            .map(|pos| &self.values[pos])
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    pub fn map<U, F>(&self, f: F) -> TimeSeries<U>
    where
        F: FnMut(&T) -> U,
    {
        TimeSeries {
            index: self.index.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Aligns this series onto `other`'s dates. Dates absent here take `default`;
    /// dates absent from `other` are dropped.
    pub fn reindex_like<U>(&self, other: &TimeSeries<U>, default: T) -> TimeSeries<T> {
        let mut values = Vec::with_capacity(other.len());
        let mut cursor = 0;

        for date in &other.index {
            while cursor < self.index.len() && self.index[cursor] < *date {
                cursor += 1;
            }
            if cursor < self.index.len() && self.index[cursor] == *date {
                values.push(self.values[cursor].clone());
            } else {
                values.push(default.clone());
            }
        }

        TimeSeries {
            index: other.index.clone(),
            values,
        }
    }
}

impl TimeSeries<f64> {
    /// Builds a price series, rejecting non-finite and non-positive prices.
    pub fn prices<I>(pairs: I) -> Result<Self, TrendEdgeError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let series = Self::from_pairs(pairs)?;
        if let Some((date, price)) = series.iter().find(|(_, p)| !p.is_finite() || **p <= 0.0) {
            return Err(TrendEdgeError::InvalidSeries {
                reason: format!("price {} on {} is not a positive number", price, date),
            });
        }
        Ok(series)
    }

    /// Simple one-period returns; the first entry is 0.
    pub fn pct_change(&self) -> Vec<f64> {
        let mut returns = Vec::with_capacity(self.len());
        if self.is_empty() {
            return returns;
        }
        returns.push(0.0);
        returns.extend(self.values.windows(2).map(|w| w[1] / w[0] - 1.0));
        returns
    }
}
