use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{reject, take_stationary};
use crate::domain::{pair_label, BacktestError, Panel, RejectedCandidate, Selection, SelectionMethod};
use crate::ports::strategy::{FormationSet, PairSelector};
use crate::strategy::johansen::{johansen_trace, JohansenResult};
use crate::strategy::stats::correlation;

/// Minimum Pearson correlation of the normalized paths
pub const CORRELATION_THRESHOLD: f64 = 0.80;

/// Pair that passed the correlation screen and the trace test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CointegratedCandidate {
    pub index_a: usize,
    pub index_b: usize,
    pub correlation: f64,
    pub johansen: JohansenResult,
}

enum Screened {
    Passed(CointegratedCandidate),
    Discarded,
    Rejected(RejectedCandidate),
}

/// Correlation screen, Johansen trace test and ADF stationarity filter
#[derive(Debug, Clone, Copy, Default)]
pub struct CointegrationSelector;

impl CointegrationSelector {
    fn screen(panel: &Panel, i: usize, j: usize) -> Result<Screened, BacktestError> {
        let (a, b) = (panel.series(i), panel.series(j));

        let Some(rho) = correlation(a, b) else {
            return Ok(Screened::Rejected(reject(panel, i, j, "correlation undefined")));
        };
        if rho < CORRELATION_THRESHOLD {
            return Ok(Screened::Discarded);
        }

        let (id_a, id_b) = (panel.assets()[i].as_str(), panel.assets()[j].as_str());
        let johansen = match johansen_trace(a, b).map_err(|e| e.for_pair(id_a, id_b)) {
            Ok(result) => result,
            Err(e) if e.is_candidate_local() => {
                return Ok(Screened::Rejected(reject(panel, i, j, e)))
            }
            Err(e) => return Err(e),
        };

        match johansen.passes() {
            Ok(true) => Ok(Screened::Passed(CointegratedCandidate {
                index_a: i,
                index_b: j,
                correlation: rho,
                johansen,
            })),
            Ok(false) => {
                debug!(
                    "{} trace {:.4} below {:.4}",
                    pair_label(id_a, id_b),
                    johansen.tested_statistic(),
                    johansen.tested_critical_value()
                );
                Ok(Screened::Discarded)
            }
            Err(e) => Ok(Screened::Rejected(reject(panel, i, j, e.for_pair(id_a, id_b)))),
        }
    }

    /// Correlation screen and trace test over every combination, ranked by
    /// descending trace statistic (stable on ties)
    pub fn rank_candidates(
        panel: &Panel,
    ) -> Result<(Vec<CointegratedCandidate>, Vec<RejectedCandidate>), BacktestError> {
        let screened: Vec<Result<Screened, BacktestError>> = panel
            .combinations()
            .par_iter()
            .map(|&(i, j)| Self::screen(panel, i, j))
            .collect();

        let mut candidates = Vec::new();
        let mut rejected = Vec::new();
        for outcome in screened {
            match outcome? {
                Screened::Passed(c) => candidates.push(c),
                Screened::Rejected(r) => rejected.push(r),
                Screened::Discarded => {}
            }
        }

        candidates.sort_by(|x, y| {
            y.johansen
                .tested_statistic()
                .total_cmp(&x.johansen.tested_statistic())
        });
        Ok((candidates, rejected))
    }
}

impl PairSelector for CointegrationSelector {
    fn method(&self) -> SelectionMethod {
        SelectionMethod::Cointegration
    }

    fn select(&self, formation: &FormationSet, count: usize) -> Result<Selection, BacktestError> {
        formation.check_count(count)?;
        let panel = formation.normalized();

        let (candidates, mut rejected) = Self::rank_candidates(panel)?;
        info!(
            "Cointegration screen: {} of {} combinations passed correlation and trace tests",
            candidates.len(),
            panel.combination_count()
        );

        let pairs = take_stationary(&candidates, panel, count, &mut rejected)?;
        for r in &rejected {
            warn!("Excluded {}: {}", pair_label(r.asset_a.as_str(), r.asset_b.as_str()), r.reason);
        }
        info!("Cointegration selection: kept {} pairs", pairs.len());

        Ok(Selection { pairs, rejected })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::AssetId;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use statrs::distribution::Normal;

    pub(crate) fn noise(n: usize, scale: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, scale).unwrap();
        (0..n).map(|_| rng.sample(normal)).collect()
    }

    /// Two strongly correlated mean-reverting paths plus an unrelated trend
    pub(crate) fn cointegrated_panel() -> FormationSet {
        let n = 300;
        let common = noise(n, 0.01, 31);
        let wobble_a = noise(n, 0.004, 32);
        let wobble_b = noise(n, 0.004, 33);

        let mut a = vec![0.0];
        let mut b = vec![0.0];
        let mut level: f64 = 0.0;
        let (mut ea, mut eb) = (0.0f64, 0.0f64);
        for t in 1..n {
            level = 0.6 * level + common[t];
            ea = 0.3 * ea + wobble_a[t];
            eb = 0.3 * eb + wobble_b[t];
            a.push(level + ea);
            b.push(level + eb);
        }
        let c: Vec<f64> = (0..n).map(|t| t as f64 * 0.002).collect();

        let assets = vec![AssetId::new("AAA"), AssetId::new("BBB"), AssetId::new("CCC")];
        let normalized = vec![a, b, c];
        let prices = normalized
            .iter()
            .map(|s| s.iter().map(|x| 50.0 * (1.0 + x)).collect())
            .collect();
        FormationSet::new(
            Panel::new(assets.clone(), normalized).unwrap(),
            Panel::new(assets, prices).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_correlation_screen_discards_unrelated() {
        let set = cointegrated_panel();
        let (candidates, rejected) = CointegrationSelector::rank_candidates(set.normalized()).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].index_a, candidates[0].index_b), (0, 1));
        assert!(candidates[0].correlation >= CORRELATION_THRESHOLD);
    }

    #[test]
    fn test_selects_stationary_pair() {
        let set = cointegrated_panel();
        let selection = CointegrationSelector.select(&set, 1).unwrap();
        let pair = &selection.pairs[0];
        assert_eq!(pair.label(), "AAA/BBB");
        assert_eq!(pair.method, SelectionMethod::Cointegration);
        let stats = pair.cointegration.unwrap();
        assert!(stats.trace_statistic > stats.critical_value);
        assert!(stats.adf_p_value <= crate::strategy::adf::STRICTEST_ADF_SIGNIFICANCE);
        assert!(pair.spread_std > 0.0);
    }

    #[test]
    fn test_insufficient_candidates() {
        let set = cointegrated_panel();
        let result = CointegrationSelector.select(&set, 2);
        assert_eq!(
            result,
            Err(BacktestError::InsufficientCandidates { requested: 2, found: 1 })
        );
    }

    #[test]
    fn test_constant_series_recorded_as_rejected() {
        let set = cointegrated_panel();
        let mut series: Vec<Vec<f64>> = (0..3).map(|i| set.normalized().series(i).to_vec()).collect();
        series[2] = vec![0.0; series[0].len()];
        let panel = Panel::new(set.normalized().assets().to_vec(), series).unwrap();
        let (_, rejected) = CointegrationSelector::rank_candidates(&panel).unwrap();
        assert_eq!(rejected.len(), 2);
        assert!(rejected.iter().all(|r| r.asset_b.as_str() == "CCC"));
    }
}
