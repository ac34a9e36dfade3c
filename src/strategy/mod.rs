//! Strategy Layer - Pair selection, OU calibration and threshold trading
//!
//! Implements the statistical core of the backtester:
//! - Series normalization into zero-based cumulative paths
//! - Distance, cointegration and OU pair selection
//! - Closed-form OU maximum-likelihood calibration
//! - Alpha/beta ratio search maximising OU likelihood
//! - Threshold-crossing trading state machine
//!
//! All functions are pure and deterministic; parallel work is collected in
//! input order before any ranking step.

pub mod adf;
pub mod johansen;
pub mod normalizer;
pub mod ou_optimizer;
pub mod ou_process;
pub mod params;
pub mod selection;
pub mod stats;
pub mod threshold_trader;

pub use adf::{adf_test, AdfResult, STRICTEST_ADF_SIGNIFICANCE};
pub use johansen::{johansen_trace, JohansenResult};
pub use normalizer::{normalize, normalized_panel};
pub use ou_optimizer::{optimize, OuFit};
pub use ou_process::{calibrate, log_likelihood, OUFit, OUParams};
pub use params::{BacktestParams, ParamsError};
pub use selection::{selector_for, CointegrationSelector, DistanceSelector, OuSelector};
pub use threshold_trader::{simulate, RoundTrip, SpreadTrader, Thresholds, TradeOutcome, TradingWindow};
