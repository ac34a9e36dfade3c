//! Equal-weight, self-financing portfolio of pair strategies
//!
//! Weights start at 1/N and drift with each pair's realised return
//! (buy-and-hold, never rebalanced). The step return is the drifted-weight
//! average of that step's pair returns.

use serde::{Deserialize, Serialize};

use super::error::BacktestError;

/// Trading periods per year used for annualisation
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Drifting per-pair weights, owned by one aggregation call
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    weights: Vec<f64>,
}

impl PortfolioState {
    pub fn equal_weight(n: usize) -> Result<Self, BacktestError> {
        if n == 0 {
            return Err(BacktestError::InvalidArgument(
                "portfolio needs at least one pair".into(),
            ));
        }
        Ok(Self {
            weights: vec![1.0 / n as f64; n],
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Apply w_t = w_{t-1} * (1 + r_{t-1})
    pub fn drift(&mut self, prior_returns: &[f64]) {
        for (w, r) in self.weights.iter_mut().zip(prior_returns) {
            *w *= 1.0 + r;
        }
    }

    /// Portfolio return for one step using the current (pre-step) weights
    pub fn step_return(&self, returns: &[f64]) -> Result<f64, BacktestError> {
        let total: f64 = self.weights.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(BacktestError::NumericalDegeneracy {
                subject: "portfolio".into(),
                reason: format!("total drifted weight is {}", total),
            });
        }
        let weighted: f64 = self.weights.iter().zip(returns).map(|(w, r)| w * r).sum();
        Ok(weighted / total)
    }
}

/// Combine aligned per-pair return series into one portfolio return series
pub fn aggregate(pair_returns: &[Vec<f64>]) -> Result<Vec<f64>, BacktestError> {
    let steps = pair_returns.first().map(Vec::len).ok_or_else(|| {
        BacktestError::InvalidArgument("portfolio needs at least one pair".into())
    })?;
    if let Some((i, series)) = pair_returns.iter().enumerate().find(|(_, s)| s.len() != steps) {
        return Err(BacktestError::InvalidArgument(format!(
            "pair {} has {} returns, expected {}",
            i,
            series.len(),
            steps
        )));
    }

    let mut state = PortfolioState::equal_weight(pair_returns.len())?;
    let mut column = vec![0.0; pair_returns.len()];
    let mut out = Vec::with_capacity(steps);

    for t in 0..steps {
        if t > 0 {
            state.drift(&column);
        }
        for (slot, series) in column.iter_mut().zip(pair_returns) {
            *slot = series[t];
        }
        out.push(state.step_return(&column)?);
    }

    Ok(out)
}

/// Headline statistics of a portfolio return series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub cumulative_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    pub fn from_returns(returns: &[f64]) -> Self {
        let mut equity = 1.0;
        let mut peak = 1.0;
        let mut max_drawdown: f64 = 0.0;
        for r in returns {
            equity *= 1.0 + r;
            peak = f64::max(peak, equity);
            max_drawdown = max_drawdown.max((peak - equity) / peak);
        }

        let n = returns.len();
        let (annualized_volatility, sharpe_ratio) = if n < 2 {
            (0.0, 0.0)
        } else {
            let mean = returns.iter().sum::<f64>() / n as f64;
            let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let std = var.sqrt();
            if std > 0.0 {
                (
                    std * PERIODS_PER_YEAR.sqrt(),
                    mean / std * PERIODS_PER_YEAR.sqrt(),
                )
            } else {
                (0.0, 0.0)
            }
        };

        Self {
            cumulative_return: equity - 1.0,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
        }
    }
}
