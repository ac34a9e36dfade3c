//! Alpha/Beta Optimizer
//!
//! Grid search over the scaling ratio r in (0, 1] that turns two price series
//! into the combination X = alpha * s1 - beta * s2 with the highest OU
//! log-likelihood. alpha = 1 / s1[0], beta = r / s2[0], so every candidate
//! combination starts at 1 - r.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ou_process::{self, OUParams, MIN_OBSERVATIONS};
use crate::domain::{BacktestError, OuScaling};

/// Ratio grid increment
pub const RATIO_STEP: f64 = 0.001;

/// Number of grid points; the last one is r = 1
pub const RATIO_STEPS: usize = 1000;

/// Best combination found by the grid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OuFit {
    pub scaling: OuScaling,
    pub ratio: f64,
    pub params: OUParams,
    pub log_likelihood: f64,
}

/// X = alpha * s1 - beta * s2, element-wise
pub fn combination(s1: &[f64], s2: &[f64], scaling: &OuScaling) -> Vec<f64> {
    s1.iter().zip(s2).map(|(a, b)| scaling.combine(*a, *b)).collect()
}

fn check_inputs(s1: &[f64], s2: &[f64], dt: f64) -> Result<(), BacktestError> {
    if s1.len() != s2.len() {
        return Err(BacktestError::InvalidArgument(format!(
            "price series differ in length: {} vs {}",
            s1.len(),
            s2.len()
        )));
    }
    if s1.len() < MIN_OBSERVATIONS {
        return Err(BacktestError::InvalidArgument(format!(
            "need at least {} prices, got {}",
            MIN_OBSERVATIONS,
            s1.len()
        )));
    }
    if !(dt.is_finite() && dt > 0.0) {
        return Err(BacktestError::InvalidArgument(format!("dt must be > 0, got {}", dt)));
    }
    for (name, first) in [("first", s1[0]), ("second", s2[0])] {
        if !(first.is_finite() && first > 0.0) {
            return Err(BacktestError::InvalidArgument(format!(
                "{} series starts at {}, expected a positive price",
                name, first
            )));
        }
    }
    Ok(())
}

/// Search r = k * RATIO_STEP for k in 1..=RATIO_STEPS, keeping the highest
/// likelihood. Ties keep the smaller ratio. Ratios whose calibration is
/// degenerate are skipped; if none survives the pair is degenerate.
pub fn optimize(s1: &[f64], s2: &[f64], dt: f64) -> Result<OuFit, BacktestError> {
    check_inputs(s1, s2, dt)?;
    let alpha = 1.0 / s1[0];

    let best = (1..=RATIO_STEPS)
        .into_par_iter()
        .filter_map(|k| {
            let ratio = k as f64 * RATIO_STEP;
            let scaling = OuScaling {
                alpha,
                beta: ratio / s2[0],
            };
            let x = combination(s1, s2, &scaling);
            ou_process::fit(&x, dt).ok().map(|fit| {
                (
                    k,
                    OuFit {
                        scaling,
                        ratio,
                        params: fit.params,
                        log_likelihood: fit.log_likelihood,
                    },
                )
            })
        })
        .reduce_with(|a, b| {
            let b_wins = b.1.log_likelihood > a.1.log_likelihood
                || (b.1.log_likelihood == a.1.log_likelihood && b.0 < a.0);
            if b_wins {
                b
            } else {
                a
            }
        });

    match best {
        Some((_, fit)) => {
            debug!(
                "OU grid search: ratio={:.3} mu={:.4} ll={:.6}",
                fit.ratio, fit.params.mu, fit.log_likelihood
            );
            Ok(fit)
        }
        None => Err(BacktestError::degenerate(format!(
            "no ratio in the {}-point grid produced a mean-reverting combination",
            RATIO_STEPS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ou_process::tests::simulate_ou;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use statrs::distribution::Normal;

    const DT: f64 = 1.0 / 252.0;

    fn random_walk(n: usize, start: f64, vol: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, vol).unwrap();
        let mut level = start;
        (0..n)
            .map(|_| {
                let current = level;
                let z: f64 = rng.sample(normal);
                level *= z.exp();
                current
            })
            .collect()
    }

    /// s1 holds 0.6 units of s2 plus an OU component starting at 0.4
    fn hedged_pair(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let s2 = random_walk(n, 50.0, 0.01, seed);
        let ou = simulate_ou(n, 0.4, 20.0, 0.05, DT, seed + 100);
        let s1 = s2
            .iter()
            .zip(&ou)
            .map(|(b, x)| 100.0 * (0.6 * b / s2[0] + x))
            .collect();
        (s1, s2)
    }

    #[test]
    fn test_recovers_hedge_ratio() {
        let (s1, s2) = hedged_pair(1000, 3);
        let fit = optimize(&s1, &s2, DT).unwrap();
        assert!((fit.ratio - 0.6).abs() < 0.05, "ratio {}", fit.ratio);
        assert_relative_eq!(fit.scaling.alpha, 1.0 / s1[0], epsilon = 1e-15);
        assert_relative_eq!(fit.scaling.beta, fit.ratio / s2[0], epsilon = 1e-15);
        assert!(fit.params.mu > 0.0);
    }

    #[test]
    fn test_best_ratio_dominates_grid() {
        let (s1, s2) = hedged_pair(400, 11);
        let fit = optimize(&s1, &s2, DT).unwrap();
        for k in [1, 250, 500, 750, 1000] {
            let scaling = OuScaling {
                alpha: 1.0 / s1[0],
                beta: k as f64 * RATIO_STEP / s2[0],
            };
            if let Ok(other) = ou_process::fit(&combination(&s1, &s2, &scaling), DT) {
                assert!(fit.log_likelihood >= other.log_likelihood);
            }
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let (s1, s2) = hedged_pair(300, 5);
        let first = optimize(&s1, &s2, DT).unwrap();
        let second = optimize(&s1, &s2, DT).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_viable_ratio_is_degenerate() {
        let flat = vec![10.0; 30];
        let result = optimize(&flat, &flat, DT);
        assert!(matches!(result, Err(BacktestError::NumericalDegeneracy { .. })));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            optimize(&[1.0, 2.0, 3.0], &[1.0, 2.0], DT),
            Err(BacktestError::InvalidArgument(_))
        ));
        assert!(matches!(
            optimize(&[0.0, 2.0, 3.0], &[1.0, 2.0, 3.0], DT),
            Err(BacktestError::InvalidArgument(_))
        ));
    }
}
