//! Series Normalizer
//!
//! Turns simple returns into a cumulative "normalized price path" that
//! restarts at 0 on the first observation of every window:
//!
//! C[start] = 0, C[t] = Π_{i=start+1..t} (1 + r_i) - 1
//!
//! Formation and trading windows are normalized independently; no
//! cumulative product is carried across the boundary.

use std::ops::Range;

use crate::domain::{BacktestError, MarketData, Panel};

/// Cumulative path of a window's returns with a zero baseline
pub fn normalize(returns: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(returns.len());
    let mut growth = 1.0;
    for (i, r) in returns.iter().enumerate() {
        if i > 0 {
            growth *= 1.0 + r;
        }
        out.push(growth - 1.0);
    }
    out
}

/// Normalized returns of every asset in the dataset over one window
pub fn normalized_panel(data: &MarketData, window: &Range<usize>) -> Result<Panel, BacktestError> {
    if window.is_empty() {
        return Err(BacktestError::InvalidArgument("cannot normalize an empty window".into()));
    }
    let assets: Vec<_> = data.assets().cloned().collect();
    let series = assets
        .iter()
        .map(|asset| data.returns_in(asset, window).map(normalize))
        .collect::<Result<Vec<_>, _>>()?;
    Panel::new(assets, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, PriceSeries};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_baseline_is_zero() {
        let c = normalize(&[0.5, 0.1, -0.1]);
        assert_eq!(c[0], 0.0);
        assert_relative_eq!(c[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(c[2], 1.1 * 0.9 - 1.0, epsilon = 1e-12);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_reproducible() {
        let r = [0.01, -0.02, 0.03, 0.004];
        assert_eq!(normalize(&r), normalize(&r));
    }

    #[test]
    fn test_windows_restart_independently() {
        let dates: Vec<NaiveDate> = (1..=8)
            .map(|d| NaiveDate::from_ymd_opt(2021, 3, d).unwrap())
            .collect();
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0];
        let data = MarketData::new(dates.clone(), vec![PriceSeries::new("X".into(), prices).unwrap()]).unwrap();
        let interval = Interval::new(dates[0], dates[4], dates[7]).unwrap();
        let windows = data.split(&interval).unwrap();

        let formation = normalized_panel(&data, &windows.formation).unwrap();
        let trading = normalized_panel(&data, &windows.trading).unwrap();

        // normalized path equals price relative to the window's first price
        assert_relative_eq!(formation.series(0)[3], 13.0 / 10.0 - 1.0, epsilon = 1e-12);
        assert_eq!(trading.series(0)[0], 0.0);
        assert_relative_eq!(trading.series(0)[2], 16.0 / 14.0 - 1.0, epsilon = 1e-12);
    }
}
