//! Adapters Layer - Implementations of the port traits
//!
//! - `csv_prices`: wide CSV price table loader
//! - `interval_sampler`: random and fixed formation/trading intervals
//! - `cli`: command-line interface

pub mod cli;
pub mod csv_prices;
pub mod interval_sampler;

pub use csv_prices::{parse_prices, CsvPriceLoader};
pub use interval_sampler::{FixedInterval, RandomIntervalSampler};
