//! Statistics helpers shared by the selectors and hypothesis tests

use nalgebra::{DMatrix, DVector};

/// Singular-value cutoff for pseudo-inverses
const PINV_EPS: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample (n - 1) standard deviation
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Pearson correlation; None when either side has no variance
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(sxy / denom)
}

/// Element-wise `a - b`
pub fn spread(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Sum of squared values
pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Subtract each column's mean
pub fn demean_columns(m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    let rows = m.nrows() as f64;
    for mut col in out.column_iter_mut() {
        let mu = col.sum() / rows;
        col.add_scalar_mut(-mu);
    }
    out
}

/// Residuals of regressing every column of `y` on `z`
pub fn residualize(y: &DMatrix<f64>, z: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let pinv = z.clone().pseudo_inverse(PINV_EPS).ok()?;
    Some(y - z * (pinv * y))
}

/// Ordinary least squares fit with classical standard errors
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    pub ssr: f64,
    pub nobs: usize,
    xtx_inv: DMatrix<f64>,
}

impl OlsFit {
    pub fn regressors(&self) -> usize {
        self.coefficients.len()
    }

    pub fn t_value(&self, i: usize) -> f64 {
        let dof = self.nobs as f64 - self.regressors() as f64;
        let s2 = self.ssr / dof;
        self.coefficients[i] / (s2 * self.xtx_inv[(i, i)]).sqrt()
    }

    /// Akaike information criterion of the Gaussian log-likelihood
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.regressors() as f64
    }
}

pub fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> Option<OlsFit> {
    if x.nrows() != y.len() || x.nrows() <= x.ncols() {
        return None;
    }
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    let coefficients = &xtx_inv * (&xt * y);
    let resid = y - x * &coefficients;
    Some(OlsFit {
        ssr: resid.dot(&resid),
        nobs: y.len(),
        coefficients,
        xtx_inv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_relative_eq!(sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 2.138089935, epsilon = 1e-8);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(correlation(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(correlation(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0, epsilon = 1e-12);
        assert_eq!(correlation(&x, &[1.0; 4]), None);
    }

    #[test]
    fn test_ols_recovers_line() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let noise = [0.1, -0.1];
        let y = DVector::from_iterator(20, xs.iter().enumerate().map(|(i, x)| 1.5 + 2.0 * x + noise[i % 2]));
        let x = DMatrix::from_fn(20, 2, |r, c| if c == 0 { 1.0 } else { xs[r] });
        let fit = ols(&y, &x).unwrap();
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-2);
        assert_relative_eq!(fit.coefficients[0], 1.5, epsilon = 1e-1);
        assert!(fit.t_value(1) > 100.0);
    }

    #[test]
    fn test_residualize_removes_fit() {
        let z = DMatrix::from_fn(10, 1, |r, _| r as f64);
        let y = DMatrix::from_fn(10, 1, |r, _| 3.0 * r as f64);
        let resid = residualize(&y, &z).unwrap();
        assert!(resid.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_demean_columns() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 10.0, 3.0, 20.0]);
        let d = demean_columns(&m);
        assert_relative_eq!(d[(0, 0)], -1.0);
        assert_relative_eq!(d[(1, 1)], 5.0);
    }
}
