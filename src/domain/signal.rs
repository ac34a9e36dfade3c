use serde::{Deserialize, Serialize};
use std::fmt;

/// Position state of one pair during its trading-window simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalState {
    #[default]
    Flat,
    /// Spread below the lower band: long the lower leg, short the higher leg
    LongSpread,
    /// Spread above the upper band: short the higher leg, long the lower leg
    ShortSpread,
}

impl SignalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, SignalState::Flat)
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Flat => write!(f, "Flat"),
            SignalState::LongSpread => write!(f, "LongSpread"),
            SignalState::ShortSpread => write!(f, "ShortSpread"),
        }
    }
}
