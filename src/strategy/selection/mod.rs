//! Pair Selection
//!
//! Three formation-window criteria behind the `PairSelector` port:
//! - `DistanceSelector`: smallest sum of squared spread deviations
//! - `CointegrationSelector`: correlation screen, Johansen trace test, then
//!   an ADF stationarity filter over the ranked candidates
//! - `OuSelector`: fastest mean reversion of the likelihood-optimal OU combination
//!
//! Candidate scoring fans out over rayon; ranking and top-N retention run
//! sequentially over the collected scores in combination order, so results do
//! not depend on thread scheduling.

pub mod cointegration;
pub mod distance;
pub mod ou;
pub mod stationarity;

pub use cointegration::{CointegratedCandidate, CointegrationSelector, CORRELATION_THRESHOLD};
pub use distance::DistanceSelector;
pub use ou::OuSelector;
pub use stationarity::take_stationary;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::stats::{mean, sample_std, spread};
use crate::domain::{BacktestError, Panel, RejectedCandidate, SelectionMethod};
use crate::ports::strategy::PairSelector;

/// Build the selector for a method; `dt` is only used by the OU criterion
pub fn selector_for(method: SelectionMethod, dt: f64) -> Box<dyn PairSelector> {
    match method {
        SelectionMethod::Distance => Box::new(DistanceSelector),
        SelectionMethod::Cointegration => Box::new(CointegrationSelector),
        SelectionMethod::OrnsteinUhlenbeck => Box::new(OuSelector::new(dt)),
    }
}

/// Mean and sample standard deviation of a signal over the formation window
pub(crate) fn moments(signal: &[f64]) -> Result<(f64, f64), BacktestError> {
    match (mean(signal), sample_std(signal)) {
        (Some(m), Some(s)) if m.is_finite() && s.is_finite() => Ok((m, s)),
        _ => Err(BacktestError::InvalidArgument(format!(
            "cannot estimate spread moments from {} observations",
            signal.len()
        ))),
    }
}

/// Moments of the unscaled spread `a - b`
pub(crate) fn spread_moments(a: &[f64], b: &[f64]) -> Result<(f64, f64), BacktestError> {
    moments(&spread(a, b))
}

pub(crate) fn reject(panel: &Panel, i: usize, j: usize, reason: impl ToString) -> RejectedCandidate {
    RejectedCandidate {
        asset_a: panel.assets()[i].clone(),
        asset_b: panel.assets()[j].clone(),
        reason: reason.to_string(),
    }
}

struct Ranked<T> {
    key: f64,
    seq: usize,
    item: T,
}

impl<T> Ranked<T> {
    fn order(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key).then(self.seq.cmp(&other.seq))
    }
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

/// Fixed-capacity collection of the entries with the smallest keys.
///
/// The worst retained entry sits on top of a max-heap and is replaced only by
/// a strictly smaller key, so among equal keys the first offered wins.
pub struct SmallestN<T> {
    capacity: usize,
    seq: usize,
    heap: BinaryHeap<Ranked<T>>,
}

impl<T> SmallestN<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seq: 0,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    pub fn offer(&mut self, key: f64, item: T) {
        let entry = Ranked {
            key,
            seq: self.seq,
            item,
        };
        self.seq += 1;

        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return;
        }
        let replace = matches!(self.heap.peek(), Some(worst) if key < worst.key);
        if replace {
            self.heap.pop();
            self.heap.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Retained items ordered by ascending key, then offer order
    pub fn into_sorted(self) -> Vec<T> {
        self.heap.into_sorted_vec().into_iter().map(|r| r.item).collect()
    }
}
