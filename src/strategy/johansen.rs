//! Johansen trace test for two series
//!
//! Constant-free (demeaned) VECM with two lagged differences. The
//! cointegrating vectors solve the generalised eigenproblem
//! S_k0 S_00^-1 S_0k v = lambda S_kk v, reduced to a symmetric problem
//! through the Cholesky factor of S_kk.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use super::stats::{demean_columns, residualize};
use crate::domain::BacktestError;

/// Lagged differences in the VECM
pub const LAG_ORDER: usize = 2;

/// Hypothesis index tested for pair selection: "at most 1 cointegrating relation"
pub const TESTED_RANK: usize = 1;

/// Trace critical values (90%, 95%, 99%) for 2 and 1 remaining relations,
/// deterministic order 0
const TRACE_CRITICAL: [[f64; 3]; 2] = [[13.4294, 15.4943, 19.9349], [2.7055, 3.8415, 6.6349]];

/// Column of the 99% critical value
const CONFIDENCE_99: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JohansenResult {
    /// Eigenvalues in descending order
    pub eigenvalues: [f64; 2],
    /// Eigenvector columns matching `eigenvalues`; `eigenvectors[j] = [load_a, load_b]`
    pub eigenvectors: [[f64; 2]; 2],
    /// Trace statistics for H0: rank <= 0 and rank <= 1
    pub trace_statistics: [f64; 2],
    pub critical_values: [[f64; 3]; 2],
}

impl JohansenResult {
    pub fn tested_statistic(&self) -> f64 {
        self.trace_statistics[TESTED_RANK]
    }

    pub fn tested_critical_value(&self) -> f64 {
        self.critical_values[TESTED_RANK][CONFIDENCE_99]
    }

    /// Statistic exceeds the 99% critical value. Errs when either side is non-finite.
    pub fn passes(&self) -> Result<bool, BacktestError> {
        let stat = self.tested_statistic();
        let cv = self.tested_critical_value();
        if !stat.is_finite() || !cv.is_finite() {
            return Err(BacktestError::undefined(
                "johansen",
                format!("trace statistic {} vs critical value {}", stat, cv),
            ));
        }
        Ok(stat > cv)
    }

    /// Loadings of the cointegrating vector with the largest eigenvalue
    pub fn leading_vector(&self) -> [f64; 2] {
        self.eigenvectors[0]
    }
}

pub fn johansen_trace(a: &[f64], b: &[f64]) -> Result<JohansenResult, BacktestError> {
    if a.len() != b.len() {
        return Err(BacktestError::InvalidArgument(format!(
            "Johansen inputs differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let t = a.len();
    // enough rows for the 2*LAG_ORDER regressors plus a residual degree of freedom
    if t < 2 * LAG_ORDER + 4 {
        return Err(BacktestError::InvalidArgument(format!(
            "Johansen test needs at least {} observations, got {}",
            2 * LAG_ORDER + 4,
            t
        )));
    }

    let levels = demean_columns(&DMatrix::from_fn(t, 2, |r, c| if c == 0 { a[r] } else { b[r] }));
    let dx = DMatrix::from_fn(t - 1, 2, |r, c| levels[(r + 1, c)] - levels[(r, c)]);

    let rows = t - 1 - LAG_ORDER;
    // [dx_{t-1}, dx_{t-2}] for each retained difference
    let z = demean_columns(&DMatrix::from_fn(rows, 2 * LAG_ORDER, |r, c| {
        let lag = c / 2 + 1;
        dx[(r + LAG_ORDER - lag, c % 2)]
    }));
    let dx_now = demean_columns(&dx.rows(LAG_ORDER, rows).into_owned());
    let lagged_levels = demean_columns(&levels.rows(1, rows).into_owned());

    let singular = || BacktestError::undefined("johansen", "singular moment matrix");
    let r0t = residualize(&dx_now, &z).ok_or_else(singular)?;
    let rkt = residualize(&lagged_levels, &z).ok_or_else(singular)?;

    let n = rows as f64;
    let skk = rkt.transpose() * &rkt / n;
    let sk0 = rkt.transpose() * &r0t / n;
    let s00 = r0t.transpose() * &r0t / n;

    let s00_inv = s00.try_inverse().ok_or_else(singular)?;
    let sig = &sk0 * s00_inv * sk0.transpose();

    let chol = skk.cholesky().ok_or_else(singular)?;
    let l_inv = chol.l().try_inverse().ok_or_else(singular)?;
    let c = &l_inv * sig * l_inv.transpose();
    let c = (&c + c.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(c);
    let vectors = l_inv.transpose() * &eigen.eigenvectors;

    let mut order = [0usize, 1];
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let mut eigenvalues = [0.0; 2];
    let mut eigenvectors = [[0.0; 2]; 2];
    for (slot, &src) in order.iter().enumerate() {
        eigenvalues[slot] = eigen.eigenvalues[src];
        let mut v = [vectors[(0, src)], vectors[(1, src)]];
        if v[0] < 0.0 {
            v = [-v[0], -v[1]];
        }
        eigenvectors[slot] = v;
    }

    let mut trace_statistics = [0.0; 2];
    for i in 0..2 {
        trace_statistics[i] = -n * eigenvalues[i..].iter().map(|l| (1.0 - l).ln()).sum::<f64>();
    }

    Ok(JohansenResult {
        eigenvalues,
        eigenvectors,
        trace_statistics,
        critical_values: TRACE_CRITICAL,
    })
}
