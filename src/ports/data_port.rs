//! Price data access port.

use crate::domain::error::TrendEdgeError;
use crate::domain::series::PriceSeries;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Close-like prices for `symbol`, inclusive of both bounds when given.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TrendEdgeError>;

    fn list_symbols(&self) -> Result<Vec<String>, TrendEdgeError>;
}
