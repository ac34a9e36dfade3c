use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use super::interval::IntervalSource;
use super::market_data::{MarketDataError, MarketDataPort};
use crate::domain::{AssetId, BacktestError, Interval, MarketData, PriceSeries};

/// In-memory market data port that counts loads
#[derive(Debug, Clone)]
pub struct MockMarketData {
    data: MarketData,
    loads: Arc<AtomicUsize>,
}

impl MockMarketData {
    pub fn new(data: MarketData) -> Self {
        Self {
            data,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build from `(asset, prices)` columns on consecutive calendar days
    pub fn from_columns(
        first_date: NaiveDate,
        columns: Vec<(&str, Vec<f64>)>,
    ) -> Result<Self, BacktestError> {
        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let dates = first_date.iter_days().take(len).collect();
        let prices = columns
            .into_iter()
            .map(|(id, values)| PriceSeries::new(AssetId::new(id), values))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(MarketData::new(dates, prices)?))
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockMarketData {
    fn load(&self) -> Result<MarketData, MarketDataError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory dataset ({} assets)", self.data.asset_count())
    }
}

/// Interval source that replays a fixed script of intervals
#[derive(Debug, Default)]
pub struct MockIntervalSource {
    script: VecDeque<Interval>,
    calls: usize,
}

impl MockIntervalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to queue the next interval
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.script.push_back(interval);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl IntervalSource for MockIntervalSource {
    fn next_interval(&mut self, _data: &MarketData) -> Result<Interval, BacktestError> {
        self.calls += 1;
        self.script
            .pop_front()
            .ok_or_else(|| BacktestError::InvalidArgument("no interval configured".into()))
    }
}
