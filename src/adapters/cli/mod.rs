//! CLI Adapter
//!
//! Command-line interface for the pairs backtester.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, init_logging, CalibrateCmd, CliApp, Command, RunCmd, SelectCmd, WindowArgs,
};
