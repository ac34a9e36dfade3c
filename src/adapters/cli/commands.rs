//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the pairs backtester.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::adapters::csv_prices::CsvPriceLoader;
use crate::adapters::interval_sampler::{FixedInterval, RandomIntervalSampler};
use crate::application::{BacktestOrchestrator, BacktestReport};
use crate::config::{load_config, Config};
use crate::domain::{AssetId, Interval, MarketData, Selection, SelectionMethod};
use crate::ports::{IntervalSource, MarketDataPort};
use crate::strategy::params::BacktestParams;

/// Pairs trading backtester: distance, cointegration and OU pair selection
#[derive(Parser, Debug)]
#[command(
    name = "pairs-backtest",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pairs trading backtester",
    long_about = "Selects asset pairs over a formation window using the distance, \
                  cointegration or Ornstein-Uhlenbeck criterion, then simulates a \
                  2-sigma mean reversion strategy over the following trading window."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one formation/trading backtest cycle
    Run(RunCmd),

    /// Select pairs over a formation window without trading them
    Select(SelectCmd),

    /// Fit the OU alpha/beta combination for two assets
    Calibrate(CalibrateCmd),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Run(cmd) => &cmd.window.config,
            Command::Select(cmd) => &cmd.window.config,
            Command::Calibrate(cmd) => &cmd.window.config,
        }
    }
}

/// Options shared by every command that needs data and an interval
#[derive(clap::Args, Debug, Clone)]
pub struct WindowArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/backtest.toml")]
    pub config: PathBuf,

    /// Override the price CSV path
    #[arg(long, value_name = "FILE")]
    pub prices: Option<PathBuf>,

    /// Fixed formation start (YYYY-MM-DD); sampled when absent
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Seed for interval sampling
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

/// Full backtest cycle
#[derive(Parser, Debug)]
pub struct RunCmd {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Override selection method (distance, cointegration, ou)
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<SelectionMethod>,

    /// Override number of pairs
    #[arg(short = 'n', long, value_name = "N")]
    pub pairs: Option<usize>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Export the full report to a JSON file
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Formation-only selection
#[derive(Parser, Debug)]
pub struct SelectCmd {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Override selection method (distance, cointegration, ou)
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<SelectionMethod>,

    /// Override number of pairs
    #[arg(short = 'n', long, value_name = "N")]
    pub pairs: Option<usize>,

    /// Print the selection as JSON
    #[arg(long)]
    pub json: bool,
}

/// OU calibration of one pair
#[derive(Parser, Debug)]
pub struct CalibrateCmd {
    /// First asset (scaled by alpha)
    #[arg(value_name = "ASSET_A")]
    pub asset_a: String,

    /// Second asset (scaled by beta)
    #[arg(value_name = "ASSET_B")]
    pub asset_b: String,

    #[command(flatten)]
    pub window: WindowArgs,
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    let config = load_config(app.command.config_path()).context("Failed to load configuration")?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Run(cmd) => run_command(cmd, &config),
        Command::Select(cmd) => select_command(cmd, &config),
        Command::Calibrate(cmd) => calibrate_command(cmd, &config),
    }
}

/// Initialize logging system; RUST_LOG wins, then the flags, then the config level
pub fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

/// Backtest parameters from the config with command-line overrides applied
fn resolve_params(
    config: &Config,
    method: Option<SelectionMethod>,
    pairs: Option<usize>,
) -> BacktestParams {
    let mut params = BacktestParams::from(config);
    if let Some(method) = method {
        params = params.with_method(method);
    }
    if let Some(pairs) = pairs {
        params = params.with_pair_count(pairs);
    }
    params
}

fn load_data(window: &WindowArgs, config: &Config) -> Result<MarketData> {
    let path = window
        .prices
        .clone()
        .unwrap_or_else(|| config.data.resolved_prices_path());
    let loader = CsvPriceLoader::new(path);
    tracing::info!("Loading prices from {}", loader.describe());
    loader
        .load()
        .with_context(|| format!("Failed to load {}", loader.describe()))
}

fn resolve_interval(
    window: &WindowArgs,
    config: &Config,
    params: &BacktestParams,
    data: &MarketData,
) -> Result<Interval> {
    let mut source: Box<dyn IntervalSource> = match window.start.or(config.backtest.formation_start) {
        Some(start) => Box::new(FixedInterval::new(Interval::from_lengths(
            start,
            params.formation_months,
            params.trading_months,
        )?)),
        None => Box::new(RandomIntervalSampler::new(
            params.formation_months,
            params.trading_months,
            window.seed.or(config.backtest.seed),
        )),
    };
    Ok(source.next_interval(data)?)
}

/// Handle run command
fn run_command(cmd: RunCmd, config: &Config) -> Result<()> {
    let params = resolve_params(config, cmd.method, cmd.pairs);
    let data = load_data(&cmd.window, config)?;
    let interval = resolve_interval(&cmd.window, config, &params, &data)?;

    let orchestrator = BacktestOrchestrator::new(params).context("Failed to create orchestrator")?;
    let report = orchestrator.run(&data, &interval).context("Backtest failed")?;

    if let Some(ref path) = cmd.export_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Handle select command
fn select_command(cmd: SelectCmd, config: &Config) -> Result<()> {
    let params = resolve_params(config, cmd.method, cmd.pairs);
    let data = load_data(&cmd.window, config)?;
    let interval = resolve_interval(&cmd.window, config, &params, &data)?;

    let orchestrator = BacktestOrchestrator::new(params).context("Failed to create orchestrator")?;
    let (_, selection) = orchestrator.select(&data, &interval).context("Pair selection failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
    } else {
        println!("Interval: {}", interval);
        print_selection(&selection);
    }
    Ok(())
}

/// Handle calibrate command
fn calibrate_command(cmd: CalibrateCmd, config: &Config) -> Result<()> {
    let params = BacktestParams::from(config);
    let data = load_data(&cmd.window, config)?;
    let interval = resolve_interval(&cmd.window, config, &params, &data)?;

    let orchestrator = BacktestOrchestrator::new(params).context("Failed to create orchestrator")?;
    let fit = orchestrator
        .calibrate_pair(
            &data,
            &interval,
            &AssetId::new(cmd.asset_a.as_str()),
            &AssetId::new(cmd.asset_b.as_str()),
        )
        .context("Calibration failed")?;

    println!("Interval: {}", interval);
    println!("Pair: {}/{}", cmd.asset_a, cmd.asset_b);
    println!("  alpha:          {:.6}", fit.scaling.alpha);
    println!("  beta:           {:.6}", fit.scaling.beta);
    println!("  ratio:          {:.3}", fit.ratio);
    println!("  theta:          {:.6}", fit.params.theta);
    println!("  mu:             {:.6}", fit.params.mu);
    println!("  sigma:          {:.6}", fit.params.sigma);
    println!("  half-life:      {:.2} years", fit.params.half_life());
    println!("  log-likelihood: {:.4}", fit.log_likelihood);
    Ok(())
}

fn print_selection(selection: &Selection) {
    println!("Selected pairs ({}):", selection.pairs.len());
    for (rank, pair) in selection.pairs.iter().enumerate() {
        println!("  {:>3}. {}", rank + 1, pair);
    }
    if !selection.rejected.is_empty() {
        println!("Rejected candidates ({}):", selection.rejected.len());
        for rejected in &selection.rejected {
            println!("  {}/{}: {}", rejected.asset_a, rejected.asset_b, rejected.reason);
        }
    }
}

fn print_report(report: &BacktestReport) {
    println!("Backtest Report");
    println!("  Interval: {}", report.interval);
    println!("  Method:   {}", report.method);
    println!();
    println!("Pairs ({}):", report.pairs.len());
    for entry in &report.pairs {
        let total = entry
            .outcome
            .returns
            .iter()
            .fold(1.0, |acc, r| acc * (1.0 + r))
            - 1.0;
        println!(
            "  {:<24} trades={:<3} return={:>8.4}%",
            entry.pair.label(),
            entry.outcome.trade_count(),
            total * 100.0
        );
    }
    if !report.rejected.is_empty() {
        println!("Rejected candidates: {}", report.rejected.len());
    }
    println!();
    println!("Portfolio ({} trading days):", report.portfolio_returns.len());
    println!("  Cumulative return:     {:>8.4}%", report.summary.cumulative_return * 100.0);
    println!("  Annualized volatility: {:>8.4}%", report.summary.annualized_volatility * 100.0);
    println!("  Sharpe ratio:          {:>8.4}", report.summary.sharpe_ratio);
    println!("  Max drawdown:          {:>8.4}%", report.summary.max_drawdown * 100.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_parse_run() {
        let args = vec!["pairs-backtest", "run"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.window.config, PathBuf::from("config/backtest.toml"));
                assert!(cmd.method.is_none());
                assert!(cmd.pairs.is_none());
                assert!(!cmd.json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_run_with_overrides() {
        let args = vec![
            "pairs-backtest", "run",
            "--method", "ou",
            "-n", "5",
            "--start", "2016-03-01",
            "--seed", "9",
            "--prices", "data/prices.csv",
            "--json",
        ];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.method, Some(SelectionMethod::OrnsteinUhlenbeck));
                assert_eq!(cmd.pairs, Some(5));
                assert_eq!(cmd.window.start, NaiveDate::from_ymd_opt(2016, 3, 1));
                assert_eq!(cmd.window.seed, Some(9));
                assert_eq!(cmd.window.prices, Some(PathBuf::from("data/prices.csv")));
                assert!(cmd.json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_rejects_unknown_method() {
        let args = vec!["pairs-backtest", "run", "--method", "kalman"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_app_rejects_bad_date() {
        let args = vec!["pairs-backtest", "select", "--start", "03/01/2016"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_app_parse_select() {
        let args = vec!["pairs-backtest", "select", "-m", "coint", "-c", "custom.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert_eq!(app.command.config_path(), Path::new("custom.toml"));
        match app.command {
            Command::Select(cmd) => {
                assert_eq!(cmd.method, Some(SelectionMethod::Cointegration));
            }
            _ => panic!("Expected Select command"),
        }
    }

    #[test]
    fn test_cli_app_parse_calibrate() {
        let args = vec!["pairs-backtest", "calibrate", "KO", "PEP", "--start", "2015-01-02"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Calibrate(cmd) => {
                assert_eq!(cmd.asset_a, "KO");
                assert_eq!(cmd.asset_b, "PEP");
                assert_eq!(cmd.window.start, NaiveDate::from_ymd_opt(2015, 1, 2));
            }
            _ => panic!("Expected Calibrate command"),
        }
    }

    #[test]
    fn test_calibrate_requires_two_assets() {
        let args = vec!["pairs-backtest", "calibrate", "KO"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["pairs-backtest", "-v", "--debug", "select"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }
}
