//! Ornstein-Uhlenbeck Process Parameter Estimation
//!
//! Closed-form Maximum Likelihood Estimation (MLE) of the discretised OU
//! process dX(t) = mu * (theta - X(t)) dt + sigma * dW(t):
//! - theta: long-run mean
//! - mu: mean reversion speed (higher = faster reversion)
//! - sigma: volatility
//!
//! With n = N - 1 transitions and the sums
//! Xx = Σ X_{i-1}, Xy = Σ X_i, Xxx = Σ X_{i-1}², Xxy = Σ X_{i-1} X_i, Xyy = Σ X_i²:
//!
//! theta = (Xy Xxx - Xx Xxy) / (n (Xxx - Xxy) - (Xx² - Xx Xy))
//! mu    = -ln((Xxy - theta Xx - theta Xy + n theta²) / (Xxx - 2 theta Xx + n theta²)) / dt
//! sigma² = 2 mu / (n (1 - a²)) * (Xyy - 2a Xxy + a² Xxx - 2 theta (1 - a)(Xy - a Xx) + n theta² (1 - a)²),
//! where a = exp(-mu dt).

use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

use crate::domain::BacktestError;

/// Minimum series length for calibration
pub const MIN_OBSERVATIONS: usize = 3;

/// OU process parameters estimated from a scalar series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OUParams {
    /// Long-run mean of the process
    pub theta: f64,
    /// Mean reversion speed, per unit of `dt`
    pub mu: f64,
    /// Volatility of the process
    pub sigma: f64,
}

impl OUParams {
    /// Half-life of mean reversion: t_1/2 = ln(2) / mu
    pub fn half_life(&self) -> f64 {
        LN_2 / self.mu
    }

    pub fn is_valid(&self) -> bool {
        self.mu > 0.0 && self.mu.is_finite() && self.sigma >= 0.0 && self.theta.is_finite()
    }
}

/// Calibrated parameters together with their average log-likelihood
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OUFit {
    pub params: OUParams,
    pub log_likelihood: f64,
}

struct Sums {
    n: f64,
    xx: f64,
    xy: f64,
    xxx: f64,
    xxy: f64,
    xyy: f64,
}

fn validate(series: &[f64], dt: f64) -> Result<(), BacktestError> {
    if series.len() < MIN_OBSERVATIONS {
        return Err(BacktestError::InvalidArgument(format!(
            "OU calibration needs at least {} observations, got {}",
            MIN_OBSERVATIONS,
            series.len()
        )));
    }
    if !(dt.is_finite() && dt > 0.0) {
        return Err(BacktestError::InvalidArgument(format!("dt must be > 0, got {}", dt)));
    }
    if series.iter().any(|x| !x.is_finite()) {
        return Err(BacktestError::InvalidArgument("series contains non-finite values".into()));
    }
    Ok(())
}

fn sums(series: &[f64]) -> Sums {
    let mut s = Sums {
        n: (series.len() - 1) as f64,
        xx: 0.0,
        xy: 0.0,
        xxx: 0.0,
        xxy: 0.0,
        xyy: 0.0,
    };
    for w in series.windows(2) {
        let (x, y) = (w[0], w[1]);
        s.xx += x;
        s.xy += y;
        s.xxx += x * x;
        s.xxy += x * y;
        s.xyy += y * y;
    }
    s
}

fn usable(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Closed-form MLE of (theta, mu, sigma)
pub fn calibrate(series: &[f64], dt: f64) -> Result<OUParams, BacktestError> {
    validate(series, dt)?;
    let s = sums(series);

    let theta_den = s.n * (s.xxx - s.xxy) - (s.xx * s.xx - s.xx * s.xy);
    if !usable(theta_den) {
        return Err(BacktestError::degenerate(format!(
            "long-run mean denominator is {}",
            theta_den
        )));
    }
    let theta = (s.xy * s.xxx - s.xx * s.xxy) / theta_den;

    let ratio_num = s.xxy - theta * s.xx - theta * s.xy + s.n * theta * theta;
    let ratio_den = s.xxx - 2.0 * theta * s.xx + s.n * theta * theta;
    if !usable(ratio_den) {
        return Err(BacktestError::degenerate(format!(
            "reversion speed denominator is {}",
            ratio_den
        )));
    }
    let ratio = ratio_num / ratio_den;
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(BacktestError::degenerate(format!(
            "autoregressive coefficient {} is not positive",
            ratio
        )));
    }
    let mu = -ratio.ln() / dt;
    if !(mu.is_finite() && mu > 0.0) {
        return Err(BacktestError::degenerate(format!(
            "mean reversion speed {} is not positive",
            mu
        )));
    }

    let a = (-mu * dt).exp();
    let sigma_den = s.n * (1.0 - a * a);
    if !usable(sigma_den) {
        return Err(BacktestError::degenerate(format!(
            "volatility denominator is {}",
            sigma_den
        )));
    }
    let sigma_sq = 2.0 * mu / sigma_den
        * (s.xyy - 2.0 * a * s.xxy + a * a * s.xxx
            - 2.0 * theta * (1.0 - a) * (s.xy - a * s.xx)
            + s.n * theta * theta * (1.0 - a).powi(2));
    // rounding can push a perfect fit slightly below zero
    let sigma = sigma_sq.max(0.0).sqrt();
    if !sigma.is_finite() {
        return Err(BacktestError::degenerate(format!("volatility estimate is {}", sigma)));
    }

    Ok(OUParams { theta, mu, sigma })
}

/// Average Gaussian log-likelihood of the discretised OU transition density
pub fn log_likelihood(series: &[f64], params: &OUParams, dt: f64) -> Result<f64, BacktestError> {
    validate(series, dt)?;
    if !params.is_valid() {
        return Err(BacktestError::degenerate(format!(
            "cannot evaluate likelihood for mu={} sigma={}",
            params.mu, params.sigma
        )));
    }

    let n = (series.len() - 1) as f64;
    let a = (-params.mu * dt).exp();
    let var = params.sigma.powi(2) * (1.0 - a * a) / (2.0 * params.mu);
    if !usable(var) || var < 0.0 {
        return Err(BacktestError::degenerate(format!("transition variance is {}", var)));
    }

    let sse: f64 = series
        .windows(2)
        .map(|w| {
            let e = w[1] - w[0] * a - params.theta * (1.0 - a);
            e * e
        })
        .sum();

    let ll = -0.5 * (2.0 * PI).ln() - 0.5 * var.ln() - sse / (2.0 * n * var);
    if !ll.is_finite() {
        return Err(BacktestError::degenerate(format!("log-likelihood is {}", ll)));
    }
    Ok(ll)
}

/// Calibrate and score in one pass
pub fn fit(series: &[f64], dt: f64) -> Result<OUFit, BacktestError> {
    let params = calibrate(series, dt)?;
    let log_likelihood = log_likelihood(series, &params, dt)?;
    Ok(OUFit { params, log_likelihood })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use statrs::distribution::Normal;

    /// Exact OU simulation started at the long-run mean
    pub(crate) fn simulate_ou(n: usize, theta: f64, mu: f64, sigma: f64, dt: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let a = (-mu * dt).exp();
        let vol = sigma * ((1.0 - a * a) / (2.0 * mu)).sqrt();
        let mut x = theta;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(x);
            let z: f64 = rng.sample(normal);
            x = theta + a * (x - theta) + vol * z;
        }
        out
    }

    #[test]
    fn test_recovers_simulated_parameters() {
        let dt = 1.0 / 252.0;
        for seed in 1..=5 {
            let path = simulate_ou(2000, 0.02, 3.0, 0.1, dt, seed);
            let params = calibrate(&path, dt).unwrap();

            assert!(params.is_valid());
            assert!(
                (params.sigma - 0.1).abs() / 0.1 < 0.10,
                "seed {}: sigma {} too far from 0.1",
                seed,
                params.sigma
            );
            // eight years of daily data pin down the speed only loosely
            assert!(params.mu > 0.3 && params.mu < 9.0, "seed {}: mu {}", seed, params.mu);
            assert!((params.theta - 0.02).abs() < 0.08, "seed {}: theta {}", seed, params.theta);
        }
    }

    #[test]
    fn test_long_sample_tightens_speed() {
        let dt = 1.0 / 252.0;
        let path = simulate_ou(50_000, 0.02, 3.0, 0.1, dt, 42);
        let params = calibrate(&path, dt).unwrap();
        assert!((params.mu - 3.0).abs() / 3.0 < 0.35, "mu {}", params.mu);
        assert!((params.sigma - 0.1).abs() / 0.1 < 0.02, "sigma {}", params.sigma);
    }

    #[test]
    fn test_deterministic() {
        let dt = 1.0 / 252.0;
        let path = simulate_ou(500, 0.0, 5.0, 0.2, dt, 9);
        assert_eq!(calibrate(&path, dt).unwrap(), calibrate(&path, dt).unwrap());
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let result = calibrate(&[1.5; 50], 1.0 / 252.0);
        assert!(matches!(result, Err(BacktestError::NumericalDegeneracy { .. })));
    }

    #[test]
    fn test_explosive_series_is_degenerate() {
        let path: Vec<f64> = (0..40).map(|i| 1.1f64.powi(i)).collect();
        let result = calibrate(&path, 1.0 / 252.0);
        assert!(matches!(result, Err(BacktestError::NumericalDegeneracy { .. })));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(calibrate(&[1.0, 2.0], 0.1), Err(BacktestError::InvalidArgument(_))));
        assert!(matches!(calibrate(&[1.0, 2.0, 1.5], 0.0), Err(BacktestError::InvalidArgument(_))));
        assert!(matches!(
            calibrate(&[1.0, f64::NAN, 1.5], 0.1),
            Err(BacktestError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_likelihood_prefers_true_parameters() {
        let dt = 1.0 / 252.0;
        let path = simulate_ou(3000, 0.0, 4.0, 0.15, dt, 7);
        let fitted = fit(&path, dt).unwrap();
        let wrong = OUParams { theta: 0.0, mu: 4.0, sigma: 0.6 };
        let wrong_ll = log_likelihood(&path, &wrong, dt).unwrap();
        assert!(fitted.log_likelihood > wrong_ll);
    }

    #[test]
    fn test_half_life() {
        let params = OUParams { theta: 0.0, mu: LN_2, sigma: 0.1 };
        approx::assert_relative_eq!(params.half_life(), 1.0, epsilon = 1e-12);
    }
}
