//! Augmented Dickey-Fuller unit-root test
//!
//! Constant-only regression with the lag order chosen by AIC over a common
//! sample, MacKinnon (1994) approximate p-values and MacKinnon (2010) finite
//! sample critical values.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use super::stats::ols;
use crate::domain::BacktestError;

/// Smallest tabulated significance level; a combination is stationary when
/// its p-value reaches it
pub const STRICTEST_ADF_SIGNIFICANCE: f64 = 0.01;

/// Minimum observations for any lag search to fit
pub const MIN_ADF_OBSERVATIONS: usize = 8;

// MacKinnon (1994) p-value surface, constant term, one variable
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) response surfaces b0 + b1/T + b2/T^2 + b3/T^3
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfCriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: AdfCriticalValues,
}

impl AdfResult {
    /// Unit root rejected at the strictest tabulated level
    pub fn is_stationary(&self) -> bool {
        self.p_value <= STRICTEST_ADF_SIGNIFICANCE
    }
}

fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Approximate p-value of an ADF statistic
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coef: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    standard_normal_cdf(polyval(coef, statistic))
}

pub fn critical_values(nobs: usize) -> AdfCriticalValues {
    let inv = 1.0 / nobs as f64;
    AdfCriticalValues {
        one_percent: polyval(&CRIT_1, inv),
        five_percent: polyval(&CRIT_5, inv),
        ten_percent: polyval(&CRIT_10, inv),
    }
}

/// Default maximum lag: ceil(12 (n/100)^(1/4)), capped at n/2 - 2
fn max_lag(nobs: usize) -> usize {
    let schwert = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min(nobs / 2 - 2)
}

/// Design for differences dx[i], i in `start..`, regressed on the lagged level
/// x[i] and `lags` lagged differences. Column order: level, lags, constant.
fn design(x: &[f64], dx: &[f64], start: usize, lags: usize) -> (DVector<f64>, DMatrix<f64>) {
    let rows = dx.len() - start;
    let y = DVector::from_fn(rows, |r, _| dx[start + r]);
    let m = DMatrix::from_fn(rows, lags + 2, |r, c| {
        let i = start + r;
        match c {
            0 => x[i],
            c if c <= lags => dx[i - c],
            _ => 1.0,
        }
    });
    (y, m)
}

pub fn adf_test(series: &[f64]) -> Result<AdfResult, BacktestError> {
    if series.len() < MIN_ADF_OBSERVATIONS {
        return Err(BacktestError::InvalidArgument(format!(
            "ADF test needs at least {} observations, got {}",
            MIN_ADF_OBSERVATIONS,
            series.len()
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(BacktestError::InvalidArgument("ADF input contains non-finite values".into()));
    }

    let dx: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let maxlag = max_lag(series.len());

    // AIC lag search on the sample shared by every candidate lag
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=maxlag {
        let (y, m) = design(series, &dx, maxlag, lags);
        let Some(fit) = ols(&y, &m) else {
            continue;
        };
        let aic = fit.aic();
        if !aic.is_finite() {
            continue;
        }
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lags));
        }
    }
    let (_, used_lag) = best.ok_or_else(|| BacktestError::undefined("adf", "no lag order could be fitted"))?;

    let (y, m) = design(series, &dx, used_lag, used_lag);
    let fit = ols(&y, &m).ok_or_else(|| BacktestError::undefined("adf", "singular final regression"))?;
    let statistic = fit.t_value(0);
    if !statistic.is_finite() {
        return Err(BacktestError::undefined("adf", format!("statistic is {}", statistic)));
    }

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs: fit.nobs,
        critical_values: critical_values(fit.nobs),
    })
}
