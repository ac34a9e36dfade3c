use crate::domain::{BacktestError, Panel, Selection, SelectionMethod};

/// Core trait for pair-selection criteria
pub trait PairSelector: Send + Sync {
    /// Criterion implemented by this selector
    fn method(&self) -> SelectionMethod;

    /// Select `count` pairs from the formation window
    fn select(&self, formation: &FormationSet, count: usize) -> Result<Selection, BacktestError>;
}

/// Formation-window inputs shared by every selector
#[derive(Debug, Clone)]
pub struct FormationSet {
    normalized: Panel,
    prices: Panel,
}

impl FormationSet {
    /// Both panels must cover the same assets in the same order over the same window
    pub fn new(normalized: Panel, prices: Panel) -> Result<Self, BacktestError> {
        if normalized.assets() != prices.assets() {
            return Err(BacktestError::InvalidArgument(
                "normalized and price panels list different assets".into(),
            ));
        }
        if normalized.observations() != prices.observations() {
            return Err(BacktestError::InvalidArgument(format!(
                "normalized panel has {} observations, price panel has {}",
                normalized.observations(),
                prices.observations()
            )));
        }
        Ok(Self { normalized, prices })
    }

    /// Cumulative return paths restarted at the window start
    pub fn normalized(&self) -> &Panel {
        &self.normalized
    }

    /// Raw prices over the window
    pub fn prices(&self) -> &Panel {
        &self.prices
    }

    /// Reject pair counts that can never be met
    pub fn check_count(&self, count: usize) -> Result<(), BacktestError> {
        let available = self.normalized.combination_count();
        if count == 0 || count > available {
            return Err(BacktestError::InvalidArgument(format!(
                "requested {} pairs but {} assets give {} combinations",
                count,
                self.normalized.len(),
                available
            )));
        }
        Ok(())
    }
}
