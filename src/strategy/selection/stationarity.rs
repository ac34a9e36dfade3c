//! Stationarity Filter (top-N)
//!
//! Walks the ranked cointegration candidates lazily and keeps the first
//! `count` whose cointegrating combination rejects a unit root at the
//! strictest ADF level. Exhausting the candidates first is an error.

use tracing::debug;

use super::cointegration::CointegratedCandidate;
use super::{reject, spread_moments};
use crate::domain::{
    pair_label, BacktestError, CointegrationStats, Pair, Panel, RejectedCandidate, SelectionMethod,
};
use crate::strategy::adf::adf_test;

fn screen(
    candidate: &CointegratedCandidate,
    panel: &Panel,
    rejected: &mut Vec<RejectedCandidate>,
) -> Result<Option<Pair>, BacktestError> {
    let (i, j) = (candidate.index_a, candidate.index_b);
    let (asset_a, asset_b) = (&panel.assets()[i], &panel.assets()[j]);
    let (a, b) = (panel.series(i), panel.series(j));
    let [eigen_a, eigen_b] = candidate.johansen.leading_vector();

    let path: Vec<f64> = a.iter().zip(b).map(|(x, y)| eigen_a * x + eigen_b * y).collect();
    let adf = match adf_test(&path) {
        Ok(result) => result,
        Err(e) if e.is_candidate_local() => {
            rejected.push(reject(panel, i, j, e.for_pair(asset_a.as_str(), asset_b.as_str())));
            return Ok(None);
        }
        Err(e) => return Err(e.for_pair(asset_a.as_str(), asset_b.as_str())),
    };

    if !adf.is_stationary() {
        debug!(
            "{} ADF p-value {:.4} above strictest level",
            pair_label(asset_a.as_str(), asset_b.as_str()),
            adf.p_value
        );
        return Ok(None);
    }

    let (spread_mean, spread_std) =
        spread_moments(a, b).map_err(|e| e.for_pair(asset_a.as_str(), asset_b.as_str()))?;
    Ok(Some(Pair {
        asset_a: asset_a.clone(),
        asset_b: asset_b.clone(),
        method: SelectionMethod::Cointegration,
        statistic: candidate.johansen.tested_statistic(),
        spread_mean,
        spread_std,
        ou_scaling: None,
        cointegration: Some(CointegrationStats {
            trace_statistic: candidate.johansen.tested_statistic(),
            critical_value: candidate.johansen.tested_critical_value(),
            eigenvalue: candidate.johansen.eigenvalues[0],
            eigen_a,
            eigen_b,
            adf_p_value: adf.p_value,
        }),
    }))
}

/// First `count` stationary candidates in rank order
pub fn take_stationary(
    candidates: &[CointegratedCandidate],
    panel: &Panel,
    count: usize,
    rejected: &mut Vec<RejectedCandidate>,
) -> Result<Vec<Pair>, BacktestError> {
    let accepted = candidates
        .iter()
        .map(|c| screen(c, panel, rejected))
        .filter_map(Result::transpose)
        .take(count)
        .collect::<Result<Vec<_>, _>>()?;

    if accepted.len() < count {
        return Err(BacktestError::InsufficientCandidates {
            requested: count,
            found: accepted.len(),
        });
    }
    Ok(accepted)
}
