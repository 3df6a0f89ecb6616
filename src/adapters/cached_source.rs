//! Time-boxed cache in front of any price source.
//!
//! Successful fetches are kept per (symbol, start, end) for `ttl`; an entry at
//! or past its ttl is refetched, and expired entries are pruned whenever a new
//! one is stored. Failures are never cached.
//!
//! A single CLI run fetches once, so hits only happen when one source
//! instance is reused across requests.

use crate::domain::error::TrendEdgeError;
use crate::domain::series::PriceSeries;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

type CacheKey = (String, Option<NaiveDate>, Option<NaiveDate>);

struct CacheEntry {
    prices: PriceSeries,
    fetched_at: Instant,
}

pub struct CachedPriceSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl<S: PriceSource> CachedPriceSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate_all(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl<S: PriceSource> PriceSource for CachedPriceSource<S> {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, TrendEdgeError> {
        let key = (symbol.to_string(), start_date, end_date);

        {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = entries.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!(symbol, "price cache hit");
                    return Ok(entry.prices.clone());
                }
            }
        }

        debug!(symbol, "price cache miss");
        let prices = self.inner.fetch_prices(symbol, start_date, end_date)?;

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        if entries.len() < before {
            debug!(pruned = before - entries.len(), "pruned expired price entries");
        }
        entries.insert(
            key,
            CacheEntry {
                prices: prices.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(prices)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendEdgeError> {
        self.inner.list_symbols()
    }
}
