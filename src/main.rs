//! Pairs Backtest - Statistical pairs trading backtester
//!
//! Distance, cointegration and Ornstein-Uhlenbeck pair selection over a
//! formation window, threshold trading over the following trading window.

use anyhow::Result;
use clap::Parser;

use pairs_backtest::adapters::cli::{execute, CliApp};

fn main() -> Result<()> {
    // Load .env file if it exists (PAIRS_PRICES_PATH may live here)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    execute(app)
}
