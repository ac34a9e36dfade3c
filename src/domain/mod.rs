//! Domain Layer - Core data model for the pairs-trading backtester
//!
//! Pure types with no I/O: aligned market data, the formation/trading
//! interval, selected pairs, the per-pair position state machine values and
//! the drifting portfolio. All external interactions happen through `ports`.

pub mod error;
pub mod series;
pub mod pair;
pub mod signal;
pub mod position;
pub mod portfolio;

pub use error::{pair_label, BacktestError};
pub use series::{AssetId, Interval, MarketData, Panel, PriceSeries, ReturnSeries, Windows};
pub use pair::{CointegrationStats, OuScaling, Pair, RejectedCandidate, Selection, SelectionMethod};
pub use signal::SignalState;
pub use position::{Leg, OpenPosition, PositionError};
pub use portfolio::{aggregate, PerformanceSummary, PortfolioState};
