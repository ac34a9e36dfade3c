//! Pairs Backtest - Statistical pairs trading backtester
//!
//! Selects asset pairs over a formation window and simulates a threshold
//! mean reversion strategy over the following trading window.
//!
//! # Modules
//!
//! - `domain`: Core data model (MarketData, Interval, Pair, Portfolio)
//! - `ports`: Trait abstractions (MarketDataPort, IntervalSource, PairSelector)
//! - `strategy`: Selection criteria, OU calibration, Johansen/ADF tests, trading state machine
//! - `adapters`: External implementations (CSV prices, interval sampling, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Backtest orchestrator

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
