pub mod orchestrator;

pub use orchestrator::{simulate_pair, BacktestOrchestrator, BacktestReport, PairOutcome};
