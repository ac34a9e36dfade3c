//! Interval Sampling
//!
//! `RandomIntervalSampler` draws a formation start uniformly from the dataset
//! dates whose whole formation + trading interval still fits in the data.
//! `FixedInterval` always hands back the same configured interval.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::{BacktestError, Interval, MarketData};
use crate::ports::interval::IntervalSource;

/// Uniform random formation start, reproducible when seeded
#[derive(Debug, Clone)]
pub struct RandomIntervalSampler {
    formation_months: u32,
    trading_months: u32,
    rng: StdRng,
}

impl RandomIntervalSampler {
    pub fn new(formation_months: u32, trading_months: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            formation_months,
            trading_months,
            rng,
        }
    }

    /// Dataset dates that can start a complete interval
    pub fn eligible_starts(&self, data: &MarketData) -> Vec<Interval> {
        let Some(&last) = data.dates().last() else {
            return Vec::new();
        };
        data.dates()
            .iter()
            .map_while(|&d| {
                Interval::from_lengths(d, self.formation_months, self.trading_months)
                    .ok()
                    .filter(|i| i.trading_end() <= last)
            })
            .collect()
    }
}

impl IntervalSource for RandomIntervalSampler {
    fn next_interval(&mut self, data: &MarketData) -> Result<Interval, BacktestError> {
        let candidates = self.eligible_starts(data);
        if candidates.is_empty() {
            return Err(BacktestError::InvalidArgument(format!(
                "dataset spanning {} dates is too short for {}+{} month intervals",
                data.dates().len(),
                self.formation_months,
                self.trading_months
            )));
        }
        let interval = candidates[self.rng.gen_range(0..candidates.len())];
        info!("Sampled interval: {}", interval);
        Ok(interval)
    }
}

/// Interval chosen up front (e.g. from `formation_start` in the config)
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Interval,
}

impl FixedInterval {
    pub fn new(interval: Interval) -> Self {
        Self { interval }
    }
}

impl IntervalSource for FixedInterval {
    fn next_interval(&mut self, data: &MarketData) -> Result<Interval, BacktestError> {
        let fits = matches!(
            (data.dates().first(), data.dates().last()),
            (Some(&first), Some(&last))
                if first <= self.interval.formation_start() && self.interval.trading_end() <= last
        );
        if !fits {
            return Err(BacktestError::InvalidArgument(format!(
                "interval {} lies outside the dataset",
                self.interval
            )));
        }
        Ok(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockMarketData;
    use crate::ports::MarketDataPort;
    use chrono::NaiveDate;

    fn daily_data(days: usize) -> MarketData {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let prices = (0..days).map(|i| 100.0 + i as f64).collect();
        MockMarketData::from_columns(start, vec![("A", prices)])
            .unwrap()
            .load()
            .unwrap()
    }

    #[test]
    fn test_sampled_interval_fits_dataset() {
        let data = daily_data(400);
        let mut sampler = RandomIntervalSampler::new(6, 3, Some(1));
        let last = *data.dates().last().unwrap();
        for _ in 0..20 {
            let interval = sampler.next_interval(&data).unwrap();
            assert!(interval.formation_start() >= data.dates()[0]);
            assert!(interval.trading_end() <= last);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let data = daily_data(400);
        let mut a = RandomIntervalSampler::new(6, 3, Some(42));
        let mut b = RandomIntervalSampler::new(6, 3, Some(42));
        for _ in 0..5 {
            assert_eq!(a.next_interval(&data).unwrap(), b.next_interval(&data).unwrap());
        }
    }

    #[test]
    fn test_dataset_too_short() {
        let data = daily_data(100);
        let mut sampler = RandomIntervalSampler::new(12, 6, Some(1));
        assert!(sampler.eligible_starts(&data).is_empty());
        assert!(matches!(
            sampler.next_interval(&data),
            Err(BacktestError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fixed_interval() {
        let data = daily_data(400);
        let start = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let interval = Interval::from_lengths(start, 6, 3).unwrap();
        let mut fixed = FixedInterval::new(interval);
        assert_eq!(fixed.next_interval(&data).unwrap(), interval);

        let late = Interval::from_lengths(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(), 6, 3).unwrap();
        assert!(FixedInterval::new(late).next_interval(&data).is_err());
    }
}
