//! Backtest Parameters
//!
//! Run-level settings for one formation/trading cycle.
//! Defaults: distance method, 20 pairs, 12-month formation, 6-month trading,
//! daily OU time step.

use serde::{Deserialize, Serialize};

use crate::domain::SelectionMethod;

/// Trading days per year behind the default OU time step
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Main backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    /// Pair-selection criterion
    pub method: SelectionMethod,
    /// Number of pairs to trade (N)
    pub pair_count: usize,
    /// Formation window length in calendar months
    pub formation_months: u32,
    /// Trading window length in calendar months
    pub trading_months: u32,
    /// OU time step between observations, in years
    pub dt: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            method: SelectionMethod::Distance,
            pair_count: 20,
            formation_months: 12,
            trading_months: 6,
            dt: 1.0 / TRADING_DAYS_PER_YEAR,
        }
    }
}

impl BacktestParams {
    pub fn with_method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_pair_count(mut self, pair_count: usize) -> Self {
        self.pair_count = pair_count;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.pair_count == 0 {
            return Err(ParamsError::InvalidPairCount(self.pair_count));
        }
        if self.formation_months == 0 {
            return Err(ParamsError::InvalidWindow("formation", self.formation_months));
        }
        if self.trading_months == 0 {
            return Err(ParamsError::InvalidWindow("trading", self.trading_months));
        }
        if !(self.dt.is_finite() && self.dt > 0.0 && self.dt <= 1.0) {
            return Err(ParamsError::InvalidTimeStep(self.dt));
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid pair count: {0} (must be > 0)")]
    InvalidPairCount(usize),
    #[error("Invalid {0} window: {1} months (must be > 0)")]
    InvalidWindow(&'static str, u32),
    #[error("Invalid time step: {0} (must be 0 < dt <= 1)")]
    InvalidTimeStep(f64),
}
