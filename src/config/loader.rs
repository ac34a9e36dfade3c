//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching backtest.toml structure.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::SelectionMethod;
use crate::strategy::params::{BacktestParams, TRADING_DAYS_PER_YEAR};

/// Environment variable that overrides `[data] prices_path`
pub const PRICES_PATH_ENV: &str = "PAIRS_PRICES_PATH";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure matching backtest.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backtest: BacktestSection,
    pub data: DataSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Backtest run configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    /// Pair-selection criterion: "distance", "cointegration" or "ou"
    pub method: SelectionMethod,
    /// Number of pairs to trade
    pub pair_count: usize,
    /// Formation window length in months
    #[serde(default = "default_formation_months")]
    pub formation_months: u32,
    /// Trading window length in months
    #[serde(default = "default_trading_months")]
    pub trading_months: u32,
    /// Fixed formation start; sampled from the data when absent
    #[serde(default)]
    pub formation_start: Option<NaiveDate>,
    /// Seed for interval sampling
    #[serde(default)]
    pub seed: Option<u64>,
    /// OU time step in years (1/252 = daily)
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_formation_months() -> u32 {
    12
}

fn default_trading_months() -> u32 {
    6
}

fn default_dt() -> f64 {
    1.0 / TRADING_DAYS_PER_YEAR
}

/// Price data configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    /// Wide CSV of prices (`date,ASSET1,ASSET2,...`)
    pub prices_path: String,
}

impl DataSection {
    /// Get prices path with environment variable override and `~` expansion.
    /// Checks PAIRS_PRICES_PATH env var first, falls back to config value
    pub fn resolved_prices_path(&self) -> PathBuf {
        let raw = std::env::var(PRICES_PATH_ENV).unwrap_or_else(|_| self.prices_path.clone());
        PathBuf::from(shellexpand::tilde(&raw).to_string())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        BacktestParams::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.data.prices_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prices_path cannot be empty".to_string(),
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }
}

// Conversion from Config to BacktestParams
impl From<&Config> for BacktestParams {
    fn from(config: &Config) -> Self {
        BacktestParams {
            method: config.backtest.method,
            pair_count: config.backtest.pair_count,
            formation_months: config.backtest.formation_months,
            trading_months: config.backtest.trading_months,
            dt: config.backtest.dt,
        }
    }
}
