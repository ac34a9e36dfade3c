use rayon::prelude::*;
use tracing::{info, warn};

use super::{moments, reject, SmallestN};
use crate::domain::{pair_label, BacktestError, Pair, RejectedCandidate, Selection, SelectionMethod};
use crate::ports::strategy::{FormationSet, PairSelector};
use crate::strategy::ou_optimizer::{combination, optimize, OuFit};

/// Fastest-reverting OU combinations of formation prices
#[derive(Debug, Clone, Copy)]
pub struct OuSelector {
    dt: f64,
}

impl OuSelector {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

enum Scored {
    Viable { i: usize, j: usize, fit: OuFit },
    Rejected(RejectedCandidate),
}

impl PairSelector for OuSelector {
    fn method(&self) -> SelectionMethod {
        SelectionMethod::OrnsteinUhlenbeck
    }

    fn select(&self, formation: &FormationSet, count: usize) -> Result<Selection, BacktestError> {
        formation.check_count(count)?;
        let prices = formation.prices();

        let scored: Vec<Result<Scored, BacktestError>> = prices
            .combinations()
            .par_iter()
            .map(|&(i, j)| {
                let (id_a, id_b) = (prices.assets()[i].as_str(), prices.assets()[j].as_str());
                match optimize(prices.series(i), prices.series(j), self.dt) {
                    Ok(fit) => Ok(Scored::Viable { i, j, fit }),
                    Err(e) if e.is_candidate_local() => {
                        Ok(Scored::Rejected(reject(prices, i, j, e.for_pair(id_a, id_b))))
                    }
                    Err(e) => Err(e.for_pair(id_a, id_b)),
                }
            })
            .collect();

        let mut top = SmallestN::new(count);
        let mut rejected = Vec::new();
        for outcome in scored {
            match outcome? {
                // largest mean-reversion speed first
                Scored::Viable { i, j, fit } => top.offer(-fit.params.mu, (i, j, fit)),
                Scored::Rejected(r) => {
                    warn!("Excluded {}: {}", pair_label(r.asset_a.as_str(), r.asset_b.as_str()), r.reason);
                    rejected.push(r);
                }
            }
        }

        if top.len() < count {
            return Err(BacktestError::InsufficientCandidates {
                requested: count,
                found: top.len(),
            });
        }

        let pairs = top
            .into_sorted()
            .into_iter()
            .map(|(i, j, fit)| {
                let (asset_a, asset_b) = (&prices.assets()[i], &prices.assets()[j]);
                let signal = combination(prices.series(i), prices.series(j), &fit.scaling);
                let (spread_mean, spread_std) = moments(&signal)
                    .map_err(|e| e.for_pair(asset_a.as_str(), asset_b.as_str()))?;
                Ok(Pair {
                    asset_a: asset_a.clone(),
                    asset_b: asset_b.clone(),
                    method: SelectionMethod::OrnsteinUhlenbeck,
                    statistic: fit.params.mu,
                    spread_mean,
                    spread_std,
                    ou_scaling: Some(fit.scaling),
                    cointegration: None,
                })
            })
            .collect::<Result<Vec<_>, BacktestError>>()?;

        info!(
            "OU selection: kept {} pairs, {} degenerate combinations excluded",
            pairs.len(),
            rejected.len()
        );
        Ok(Selection { pairs, rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, Panel};
    use crate::strategy::normalizer::normalize;
    use crate::strategy::ou_process::tests::simulate_ou;

    const DT: f64 = 1.0 / 252.0;

    fn price_set(series: Vec<(&str, Vec<f64>)>) -> FormationSet {
        let assets: Vec<AssetId> = series.iter().map(|(id, _)| AssetId::new(*id)).collect();
        let prices: Vec<Vec<f64>> = series.into_iter().map(|(_, v)| v).collect();
        let normalized = prices
            .iter()
            .map(|p| {
                let returns: Vec<f64> = std::iter::once(0.0)
                    .chain(p.windows(2).map(|w| w[1] / w[0] - 1.0))
                    .collect();
                normalize(&returns)
            })
            .collect();
        FormationSet::new(
            Panel::new(assets.clone(), normalized).unwrap(),
            Panel::new(assets, prices).unwrap(),
        )
        .unwrap()
    }

    fn reverting(mu: f64, seed: u64) -> Vec<f64> {
        simulate_ou(400, 0.0, mu, 0.2, DT, seed)
            .into_iter()
            .map(|x| 100.0 * (1.0 + x))
            .collect()
    }

    #[test]
    fn test_prefers_faster_reversion() {
        let anchor = vec![100.0; 400];
        let set = price_set(vec![
            ("FAST", reverting(60.0, 1)),
            ("SLOW", reverting(8.0, 2)),
            ("CASH", anchor),
        ]);
        let selection = OuSelector::new(DT).select(&set, 3).unwrap();
        let speeds: Vec<f64> = selection.pairs.iter().map(|p| p.statistic).collect();
        assert!(speeds.windows(2).all(|w| w[0] >= w[1]), "{:?}", speeds);
        for pair in &selection.pairs {
            assert_eq!(pair.method, SelectionMethod::OrnsteinUhlenbeck);
            assert!(pair.ou_scaling.is_some());
            assert!(pair.spread_std > 0.0);
        }
        assert!(selection.pairs[0].label().starts_with("FAST/"));
        assert_eq!(selection.pairs[2].label(), "SLOW/CASH");
    }

    #[test]
    fn test_signal_moments_use_scaled_combination() {
        let set = price_set(vec![("X", reverting(30.0, 5)), ("Y", vec![50.0; 400])]);
        let selection = OuSelector::new(DT).select(&set, 1).unwrap();
        let pair = &selection.pairs[0];
        let scaling = pair.ou_scaling.unwrap();
        let signal = combination(set.prices().series(0), set.prices().series(1), &scaling);
        let (m, s) = moments(&signal).unwrap();
        assert_eq!(pair.spread_mean, m);
        assert_eq!(pair.spread_std, s);
    }

    #[test]
    fn test_degenerate_pairs_are_rejected() {
        let set = price_set(vec![
            ("FLAT1", vec![10.0; 100]),
            ("FLAT2", vec![20.0; 100]),
            ("OU", reverting(80.0, 9)[..100].to_vec()),
        ]);
        let selection = OuSelector::new(DT).select(&set, 2).unwrap();
        assert_eq!(selection.pairs.len(), 2);
        assert_eq!(selection.rejected.len(), 1);
        assert_eq!(selection.rejected[0].asset_a.as_str(), "FLAT1");
        assert!(selection.rejected[0].reason.contains("FLAT1/FLAT2"));

        let result = OuSelector::new(DT).select(&set, 3);
        assert_eq!(
            result,
            Err(BacktestError::InsufficientCandidates { requested: 3, found: 2 })
        );
    }
}
