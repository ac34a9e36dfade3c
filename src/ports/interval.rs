use crate::domain::{BacktestError, Interval, MarketData};

/// Producer of the (formation start, formation end, trading end) triple
pub trait IntervalSource: Send + Sync {
    /// Pick an interval that fits inside the dataset's calendar
    fn next_interval(&mut self, data: &MarketData) -> Result<Interval, BacktestError>;
}
