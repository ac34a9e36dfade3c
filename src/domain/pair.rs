use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::pair_label;
use super::series::AssetId;

/// Pair-selection criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Smallest sum of squared spread deviations
    Distance,
    /// Johansen trace test followed by an ADF stationarity filter
    Cointegration,
    /// Fastest Ornstein-Uhlenbeck mean reversion
    #[serde(rename = "ou")]
    OrnsteinUhlenbeck,
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMethod::Distance => write!(f, "distance"),
            SelectionMethod::Cointegration => write!(f, "cointegration"),
            SelectionMethod::OrnsteinUhlenbeck => write!(f, "ou"),
        }
    }
}

impl FromStr for SelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distance" | "ssd" => Ok(SelectionMethod::Distance),
            "cointegration" | "coint" => Ok(SelectionMethod::Cointegration),
            "ou" | "ornstein-uhlenbeck" | "ornstein_uhlenbeck" => {
                Ok(SelectionMethod::OrnsteinUhlenbeck)
            }
            other => Err(format!(
                "unknown selection method '{}' (expected distance, cointegration or ou)",
                other
            )),
        }
    }
}

/// OU combination `alpha * price_a - beta * price_b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OuScaling {
    pub alpha: f64,
    pub beta: f64,
}

impl OuScaling {
    pub fn combine(&self, price_a: f64, price_b: f64) -> f64 {
        self.alpha * price_a - self.beta * price_b
    }
}

/// Johansen trace test output retained for a cointegrated pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CointegrationStats {
    pub trace_statistic: f64,
    pub critical_value: f64,
    pub eigenvalue: f64,
    /// Loading of asset A in the cointegrating vector
    pub eigen_a: f64,
    /// Loading of asset B in the cointegrating vector
    pub eigen_b: f64,
    /// ADF p-value of the cointegrating combination
    pub adf_p_value: f64,
}

/// A selected pair; immutable once built by a selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub method: SelectionMethod,
    /// SSD, trace statistic or OU mean-reversion speed depending on `method`
    pub statistic: f64,
    /// Formation-period mean of the trading signal
    pub spread_mean: f64,
    /// Formation-period standard deviation of the trading signal
    pub spread_std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ou_scaling: Option<OuScaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cointegration: Option<CointegrationStats>,
}

impl Pair {
    pub fn label(&self) -> String {
        pair_label(self.asset_a.as_str(), self.asset_b.as_str())
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} stat={:.6} mean={:.6} std={:.6}]",
            self.label(),
            self.method,
            self.statistic,
            self.spread_mean,
            self.spread_std
        )
    }
}

/// A candidate excluded by a selector's local recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub reason: String,
}

/// Selector output: ranked pairs plus the candidates it excluded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub pairs: Vec<Pair>,
    pub rejected: Vec<RejectedCandidate>,
}
