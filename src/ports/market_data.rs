use thiserror::Error;

use crate::domain::{BacktestError, MarketData};

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Invalid dataset: {0}")]
    Invalid(#[from] BacktestError),
}

/// Source of the aligned price dataset
pub trait MarketDataPort: Send + Sync {
    /// Load every asset's prices on a common calendar
    fn load(&self) -> Result<MarketData, MarketDataError>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}
