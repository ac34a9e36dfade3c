//! Market data model
//!
//! Aligned price and return series for a universe of assets, the
//! formation/trading interval triple, and the per-window panels the
//! selectors consume.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use super::error::BacktestError;

/// Minimum number of formation observations needed by the calibrator
pub const MIN_FORMATION_OBSERVATIONS: usize = 3;

/// Ticker or other unique asset identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        AssetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        AssetId(id.to_string())
    }
}

/// Strictly positive prices for one asset, aligned to the dataset calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub asset: AssetId,
    values: Vec<f64>,
}

impl PriceSeries {
    pub fn new(asset: AssetId, values: Vec<f64>) -> Result<Self, BacktestError> {
        if let Some((idx, bad)) = values
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(BacktestError::InvalidArgument(format!(
                "price for {} at index {} must be finite and > 0, got {}",
                asset, idx, bad
            )));
        }
        Ok(Self { asset, values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Simple periodic returns; `values[0]` is 0.0 since no prior price exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub asset: AssetId,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn from_prices(prices: &PriceSeries) -> Self {
        let p = prices.values();
        let mut values = Vec::with_capacity(p.len());
        if !p.is_empty() {
            values.push(0.0);
        }
        values.extend(p.windows(2).map(|w| w[1] / w[0] - 1.0));
        Self {
            asset: prices.asset.clone(),
            values,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Formation start, formation end, trading end
///
/// Formation covers `[formation_start, formation_end)`, trading covers
/// `[formation_end, trading_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    formation_start: NaiveDate,
    formation_end: NaiveDate,
    trading_end: NaiveDate,
}

impl Interval {
    pub fn new(
        formation_start: NaiveDate,
        formation_end: NaiveDate,
        trading_end: NaiveDate,
    ) -> Result<Self, BacktestError> {
        if !(formation_start < formation_end && formation_end < trading_end) {
            return Err(BacktestError::InvalidArgument(format!(
                "interval must satisfy start < formation end < trading end, got {} / {} / {}",
                formation_start, formation_end, trading_end
            )));
        }
        Ok(Self {
            formation_start,
            formation_end,
            trading_end,
        })
    }

    /// Build an interval from calendar-month formation and trading lengths
    pub fn from_lengths(
        formation_start: NaiveDate,
        formation_months: u32,
        trading_months: u32,
    ) -> Result<Self, BacktestError> {
        let formation_end = formation_start
            .checked_add_months(Months::new(formation_months))
            .ok_or_else(|| BacktestError::InvalidArgument("formation end out of range".into()))?;
        let trading_end = formation_end
            .checked_add_months(Months::new(trading_months))
            .ok_or_else(|| BacktestError::InvalidArgument("trading end out of range".into()))?;
        Self::new(formation_start, formation_end, trading_end)
    }

    pub fn formation_start(&self) -> NaiveDate {
        self.formation_start
    }

    pub fn formation_end(&self) -> NaiveDate {
        self.formation_end
    }

    pub fn trading_end(&self) -> NaiveDate {
        self.trading_end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "formation {}..{} trading {}..{}",
            self.formation_start, self.formation_end, self.formation_end, self.trading_end
        )
    }
}

/// Index ranges of the formation and trading windows inside a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Windows {
    pub formation: Range<usize>,
    pub trading: Range<usize>,
}

/// Aligned price/return dataset produced by the data-acquisition collaborator
#[derive(Debug, Clone)]
pub struct MarketData {
    dates: Vec<NaiveDate>,
    prices: Vec<PriceSeries>,
    returns: Vec<ReturnSeries>,
    index: HashMap<AssetId, usize>,
}

impl MarketData {
    pub fn new(dates: Vec<NaiveDate>, prices: Vec<PriceSeries>) -> Result<Self, BacktestError> {
        if prices.is_empty() {
            return Err(BacktestError::InvalidArgument("dataset has no assets".into()));
        }
        if dates.len() < 2 {
            return Err(BacktestError::InvalidArgument(format!(
                "dataset needs at least 2 dates, got {}",
                dates.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BacktestError::InvalidArgument(format!(
                "dates must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }

        let mut index = HashMap::with_capacity(prices.len());
        for (i, series) in prices.iter().enumerate() {
            if series.len() != dates.len() {
                return Err(BacktestError::InvalidArgument(format!(
                    "{} has {} prices but the calendar has {} dates",
                    series.asset,
                    series.len(),
                    dates.len()
                )));
            }
            if index.insert(series.asset.clone(), i).is_some() {
                return Err(BacktestError::InvalidArgument(format!(
                    "duplicate asset id {}",
                    series.asset
                )));
            }
        }

        let returns = prices.iter().map(ReturnSeries::from_prices).collect();
        Ok(Self {
            dates,
            prices,
            returns,
            index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.prices.iter().map(|p| &p.asset)
    }

    pub fn asset_count(&self) -> usize {
        self.prices.len()
    }

    pub fn index_of(&self, asset: &AssetId) -> Option<usize> {
        self.index.get(asset).copied()
    }

    pub fn prices(&self, asset: &AssetId) -> Option<&[f64]> {
        self.index_of(asset).map(|i| self.prices[i].values())
    }

    pub fn returns(&self, asset: &AssetId) -> Option<&[f64]> {
        self.index_of(asset).map(|i| self.returns[i].values())
    }

    fn lookup<'a>(&self, series: Option<&'a [f64]>, asset: &AssetId) -> Result<&'a [f64], BacktestError> {
        series.ok_or_else(|| BacktestError::InvalidArgument(format!("unknown asset {}", asset)))
    }

    pub fn prices_in(&self, asset: &AssetId, window: &Range<usize>) -> Result<&[f64], BacktestError> {
        Ok(&self.lookup(self.prices(asset), asset)?[window.clone()])
    }

    pub fn returns_in(&self, asset: &AssetId, window: &Range<usize>) -> Result<&[f64], BacktestError> {
        Ok(&self.lookup(self.returns(asset), asset)?[window.clone()])
    }

    /// Map an interval onto formation and trading index windows
    pub fn split(&self, interval: &Interval) -> Result<Windows, BacktestError> {
        let lower = |d: NaiveDate| self.dates.partition_point(|x| *x < d);
        let fs = lower(interval.formation_start());
        let fe = lower(interval.formation_end());
        let te = lower(interval.trading_end());

        if fe - fs < MIN_FORMATION_OBSERVATIONS {
            return Err(BacktestError::InvalidArgument(format!(
                "formation window {}..{} holds {} observations, need at least {}",
                interval.formation_start(),
                interval.formation_end(),
                fe - fs,
                MIN_FORMATION_OBSERVATIONS
            )));
        }
        if te == fe {
            return Err(BacktestError::InvalidArgument(format!(
                "trading window {}..{} holds no observations",
                interval.formation_end(),
                interval.trading_end()
            )));
        }

        Ok(Windows {
            formation: fs..fe,
            trading: fe..te,
        })
    }

    /// Price panel of every asset over a window
    pub fn price_panel(&self, window: &Range<usize>) -> Panel {
        Panel {
            assets: self.prices.iter().map(|p| p.asset.clone()).collect(),
            series: self
                .prices
                .iter()
                .map(|p| p.values()[window.clone()].to_vec())
                .collect(),
        }
    }
}

/// Equal-length series for a list of assets over one window
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    assets: Vec<AssetId>,
    series: Vec<Vec<f64>>,
}

impl Panel {
    pub fn new(assets: Vec<AssetId>, series: Vec<Vec<f64>>) -> Result<Self, BacktestError> {
        if assets.len() != series.len() {
            return Err(BacktestError::InvalidArgument(format!(
                "{} asset ids for {} series",
                assets.len(),
                series.len()
            )));
        }
        let len = series.first().map(Vec::len).unwrap_or(0);
        if series.iter().any(|s| s.len() != len) {
            return Err(BacktestError::InvalidArgument(
                "panel series must share the same length".into(),
            ));
        }
        if len == 0 && !series.is_empty() {
            return Err(BacktestError::InvalidArgument("panel series are empty".into()));
        }
        Ok(Self { assets, series })
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn series(&self, i: usize) -> &[f64] {
        &self.series[i]
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn observations(&self) -> usize {
        self.series.first().map(Vec::len).unwrap_or(0)
    }

    /// Unordered index pairs (i < j) in iteration order
    pub fn combinations(&self) -> Vec<(usize, usize)> {
        let n = self.assets.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect()
    }

    pub fn combination_count(&self) -> usize {
        let n = self.assets.len();
        n * n.saturating_sub(1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(n: usize) -> Vec<NaiveDate> {
        (0..n).map(|i| date(2020, 1, 1) + chrono::Duration::days(i as i64)).collect()
    }

    fn dataset() -> MarketData {
        MarketData::new(
            daily(10),
            vec![
                PriceSeries::new("AAA".into(), (1..=10).map(|x| x as f64).collect()).unwrap(),
                PriceSeries::new("BBB".into(), vec![10.0; 10]).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_price_series_rejects_non_positive() {
        assert!(PriceSeries::new("X".into(), vec![1.0, 0.0]).is_err());
        assert!(PriceSeries::new("X".into(), vec![1.0, f64::NAN]).is_err());
        assert!(PriceSeries::new("X".into(), vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_returns_derived_from_prices() {
        let data = dataset();
        let r = data.returns(&"AAA".into()).unwrap();
        assert_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 1.0);
        assert_relative_eq!(r[2], 0.5);
        assert!(data.returns(&"BBB".into()).unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_market_data_validation() {
        let short = PriceSeries::new("AAA".into(), vec![1.0; 3]).unwrap();
        assert!(MarketData::new(daily(4), vec![short]).is_err());

        let a = PriceSeries::new("AAA".into(), vec![1.0; 4]).unwrap();
        let b = PriceSeries::new("AAA".into(), vec![1.0; 4]).unwrap();
        assert!(MarketData::new(daily(4), vec![a.clone(), b]).is_err());

        let mut dates = daily(4);
        dates.swap(1, 2);
        assert!(MarketData::new(dates, vec![a]).is_err());
    }

    #[test]
    fn test_interval_ordering() {
        assert!(Interval::new(date(2020, 1, 1), date(2020, 1, 1), date(2020, 2, 1)).is_err());
        assert!(Interval::new(date(2020, 1, 1), date(2020, 3, 1), date(2020, 2, 1)).is_err());
        let interval = Interval::from_lengths(date(2020, 1, 31), 12, 6).unwrap();
        assert_eq!(interval.formation_end(), date(2021, 1, 31));
        assert_eq!(interval.trading_end(), date(2021, 7, 31));
    }

    #[test]
    fn test_split_windows() {
        let data = dataset();
        let interval = Interval::new(date(2020, 1, 2), date(2020, 1, 6), date(2020, 1, 9)).unwrap();
        let windows = data.split(&interval).unwrap();
        assert_eq!(windows.formation, 1..5);
        assert_eq!(windows.trading, 5..8);
        assert_eq!(data.prices_in(&"AAA".into(), &windows.trading).unwrap(), &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_split_rejects_short_formation() {
        let data = dataset();
        let interval = Interval::new(date(2020, 1, 1), date(2020, 1, 3), date(2020, 1, 9)).unwrap();
        assert!(matches!(data.split(&interval), Err(BacktestError::InvalidArgument(_))));
    }

    #[test]
    fn test_panel_combinations() {
        let panel = Panel::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec![vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]],
        )
        .unwrap();
        assert_eq!(panel.combinations(), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(panel.combination_count(), 3);
    }
}
