//! Backtest error taxonomy shared by every layer of the core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subject used when a calibration error is raised outside any pair context
pub const NO_PAIR: &str = "series";

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum BacktestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Numerical degeneracy in {subject}: {reason}")]
    NumericalDegeneracy { subject: String, reason: String },

    #[error("Insufficient candidates: {found} of {requested} requested pairs passed selection")]
    InsufficientCandidates { requested: usize, found: usize },

    #[error("Undefined statistic for {subject}: {statistic}")]
    UndefinedStatistic { subject: String, statistic: String },
}

impl BacktestError {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        BacktestError::NumericalDegeneracy {
            subject: NO_PAIR.to_string(),
            reason: reason.into(),
        }
    }

    pub fn undefined(subject: impl Into<String>, statistic: impl Into<String>) -> Self {
        BacktestError::UndefinedStatistic {
            subject: subject.into(),
            statistic: statistic.into(),
        }
    }

    /// Attach the offending pair to an error raised without pair context
    pub fn for_pair(self, asset_a: &str, asset_b: &str) -> Self {
        let subject = pair_label(asset_a, asset_b);
        match self {
            BacktestError::NumericalDegeneracy { reason, .. } => {
                BacktestError::NumericalDegeneracy { subject, reason }
            }
            BacktestError::UndefinedStatistic { statistic, .. } => {
                BacktestError::UndefinedStatistic { subject, statistic }
            }
            BacktestError::InvalidArgument(reason) => {
                BacktestError::InvalidArgument(format!("{}: {}", subject, reason))
            }
            other => other,
        }
    }

    /// True for failures that selectors treat as exclusion rather than termination
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            BacktestError::NumericalDegeneracy { .. } | BacktestError::UndefinedStatistic { .. }
        )
    }
}

/// Canonical "A/B" label used in logs and error subjects
pub fn pair_label(asset_a: &str, asset_b: &str) -> String {
    format!("{}/{}", asset_a, asset_b)
}
