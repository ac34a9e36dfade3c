//! Ports Layer - Trait definitions for external collaborators
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Price data acquisition (aligned price dataset)
//! - Formation/trading interval sampling
//! - Pair-selection criteria

pub mod interval;
pub mod market_data;
pub mod mocks;
pub mod strategy;

pub use interval::IntervalSource;
pub use market_data::{MarketDataError, MarketDataPort};
pub use mocks::{MockIntervalSource, MockMarketData};
pub use strategy::{FormationSet, PairSelector};
