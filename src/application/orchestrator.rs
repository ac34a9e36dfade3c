//! Backtest Orchestrator
//!
//! Coordinates one formation/trading cycle:
//! 1. Split the dataset on the interval and normalize each window independently
//! 2. Select pairs on the formation window
//! 3. Simulate every selected pair over the trading window (in parallel)
//! 4. Aggregate pair returns into the equal-weight portfolio

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    aggregate, AssetId, BacktestError, Interval, MarketData, Pair, PerformanceSummary,
    RejectedCandidate, Selection, SelectionMethod, Windows,
};
use crate::ports::strategy::{FormationSet, PairSelector};
use crate::strategy::normalizer::{normalize, normalized_panel};
use crate::strategy::ou_optimizer::{combination, optimize, OuFit};
use crate::strategy::params::BacktestParams;
use crate::strategy::selection::selector_for;
use crate::strategy::stats::spread;
use crate::strategy::threshold_trader::{simulate, Thresholds, TradeOutcome, TradingWindow};

/// A selected pair together with its trading-window simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairOutcome {
    pub pair: Pair,
    pub outcome: TradeOutcome,
}

/// Everything one backtest cycle produced, for reporting collaborators
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub interval: Interval,
    pub method: SelectionMethod,
    pub trading_dates: Vec<NaiveDate>,
    pub pairs: Vec<PairOutcome>,
    pub rejected: Vec<RejectedCandidate>,
    pub portfolio_returns: Vec<f64>,
    pub summary: PerformanceSummary,
}

impl BacktestReport {
    pub fn trade_count(&self) -> usize {
        self.pairs.iter().map(|p| p.outcome.trade_count()).sum()
    }
}

/// Main orchestrator that wires a selector to the trading simulation
pub struct BacktestOrchestrator {
    params: BacktestParams,
    selector: Box<dyn PairSelector>,
}

impl BacktestOrchestrator {
    /// Create a new orchestrator using the selector for `params.method`
    pub fn new(params: BacktestParams) -> Result<Self, BacktestError> {
        let selector = selector_for(params.method, params.dt);
        Self::with_selector(params, selector)
    }

    /// Create an orchestrator with a custom selector
    pub fn with_selector(
        params: BacktestParams,
        selector: Box<dyn PairSelector>,
    ) -> Result<Self, BacktestError> {
        params
            .validate()
            .map_err(|e| BacktestError::InvalidArgument(e.to_string()))?;
        Ok(Self { params, selector })
    }

    pub fn params(&self) -> &BacktestParams {
        &self.params
    }

    /// Normalized and raw formation panels for every asset
    pub fn formation_set(data: &MarketData, windows: &Windows) -> Result<FormationSet, BacktestError> {
        FormationSet::new(
            normalized_panel(data, &windows.formation)?,
            data.price_panel(&windows.formation),
        )
    }

    /// Run only the formation half of the cycle
    pub fn select(&self, data: &MarketData, interval: &Interval) -> Result<(Windows, Selection), BacktestError> {
        let windows = data.split(interval)?;
        let formation = Self::formation_set(data, &windows)?;
        let selection = self.selector.select(&formation, self.params.pair_count)?;
        info!(
            "Formation {}..{}: selected {} {} pairs ({} rejected)",
            interval.formation_start(),
            interval.formation_end(),
            selection.pairs.len(),
            self.selector.method(),
            selection.rejected.len()
        );
        Ok((windows, selection))
    }

    /// Full cycle: select, simulate, aggregate
    pub fn run(&self, data: &MarketData, interval: &Interval) -> Result<BacktestReport, BacktestError> {
        let (windows, selection) = self.select(data, interval)?;

        let pairs = selection
            .pairs
            .into_par_iter()
            .map(|pair| -> Result<PairOutcome, BacktestError> {
                let outcome = simulate_pair(data, &windows, &pair)?;
                debug!("{}: {} round trips", pair.label(), outcome.trade_count());
                Ok(PairOutcome { pair, outcome })
            })
            .collect::<Result<Vec<_>, BacktestError>>()?;

        let pair_returns: Vec<Vec<f64>> = pairs.iter().map(|p| p.outcome.returns.clone()).collect();
        let portfolio_returns = aggregate(&pair_returns)?;
        let summary = PerformanceSummary::from_returns(&portfolio_returns);

        let report = BacktestReport {
            interval: *interval,
            method: self.selector.method(),
            trading_dates: data.dates()[windows.trading.clone()].to_vec(),
            pairs,
            rejected: selection.rejected,
            portfolio_returns,
            summary,
        };
        info!(
            "Trading {}..{}: {} round trips, cumulative return {:.4}%, max drawdown {:.4}%",
            interval.formation_end(),
            interval.trading_end(),
            report.trade_count(),
            report.summary.cumulative_return * 100.0,
            report.summary.max_drawdown * 100.0
        );
        Ok(report)
    }

    /// OU alpha/beta search for two named assets over the formation window
    pub fn calibrate_pair(
        &self,
        data: &MarketData,
        interval: &Interval,
        asset_a: &AssetId,
        asset_b: &AssetId,
    ) -> Result<OuFit, BacktestError> {
        let windows = data.split(interval)?;
        let prices_a = data.prices_in(asset_a, &windows.formation)?;
        let prices_b = data.prices_in(asset_b, &windows.formation)?;
        optimize(prices_a, prices_b, self.params.dt)
            .map_err(|e| e.for_pair(asset_a.as_str(), asset_b.as_str()))
    }
}

/// Trading-window simulation of one pair on its own signal
pub fn simulate_pair(data: &MarketData, windows: &Windows, pair: &Pair) -> Result<TradeOutcome, BacktestError> {
    let window = &windows.trading;
    let returns_a = data.returns_in(&pair.asset_a, window)?;
    let returns_b = data.returns_in(&pair.asset_b, window)?;

    // legs are always ranked on normalized paths; OU pairs only swap the signal
    let levels_a = normalize(returns_a);
    let levels_b = normalize(returns_b);
    let signal = match pair.ou_scaling {
        Some(scaling) => combination(
            data.prices_in(&pair.asset_a, window)?,
            data.prices_in(&pair.asset_b, window)?,
            &scaling,
        ),
        None => spread(&levels_a, &levels_b),
    };

    let thresholds = Thresholds::for_pair(pair)?;
    simulate(
        thresholds,
        &TradingWindow {
            signal: &signal,
            levels_a: &levels_a,
            levels_b: &levels_b,
            returns_a,
            returns_b,
        },
    )
    .map_err(|e| e.for_pair(pair.asset_a.as_str(), pair.asset_b.as_str()))
}
