use rayon::prelude::*;
use tracing::{debug, info};

use super::{spread_moments, SmallestN};
use crate::domain::{pair_label, BacktestError, Pair, Selection, SelectionMethod};
use crate::ports::strategy::{FormationSet, PairSelector};
use crate::strategy::stats::{spread, sum_of_squares};

/// Minimum-distance (SSD) pair selection over normalized formation paths
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceSelector;

struct Scored {
    i: usize,
    j: usize,
    ssd: f64,
    mean: f64,
    std: f64,
}

impl PairSelector for DistanceSelector {
    fn method(&self) -> SelectionMethod {
        SelectionMethod::Distance
    }

    fn select(&self, formation: &FormationSet, count: usize) -> Result<Selection, BacktestError> {
        formation.check_count(count)?;
        let panel = formation.normalized();
        let combinations = panel.combinations();

        let scored: Vec<Result<Scored, BacktestError>> = combinations
            .par_iter()
            .map(|&(i, j)| {
                let (a, b) = (panel.series(i), panel.series(j));
                let ssd = sum_of_squares(&spread(a, b));
                let (mean, std) = spread_moments(a, b).map_err(|e| {
                    e.for_pair(panel.assets()[i].as_str(), panel.assets()[j].as_str())
                })?;
                Ok(Scored { i, j, ssd, mean, std })
            })
            .collect();

        let mut top = SmallestN::new(count);
        for candidate in scored {
            let candidate = candidate?;
            top.offer(candidate.ssd, candidate);
        }

        let pairs: Vec<Pair> = top
            .into_sorted()
            .into_iter()
            .map(|c| {
                let (a, b) = (&panel.assets()[c.i], &panel.assets()[c.j]);
                debug!("{} ssd={:.6}", pair_label(a.as_str(), b.as_str()), c.ssd);
                Pair {
                    asset_a: a.clone(),
                    asset_b: b.clone(),
                    method: SelectionMethod::Distance,
                    statistic: c.ssd,
                    spread_mean: c.mean,
                    spread_std: c.std,
                    ou_scaling: None,
                    cointegration: None,
                }
            })
            .collect();

        info!(
            "Distance selection: kept {} of {} combinations",
            pairs.len(),
            combinations.len()
        );
        Ok(Selection {
            pairs,
            rejected: Vec::new(),
        })
    }
}
