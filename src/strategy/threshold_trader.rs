//! Threshold Trading State Machine
//!
//! Turns a pair's trading-window signal into positions and realised returns
//! using the formation-period mean and standard deviation of that signal:
//! - Entry: signal at or beyond mean ± 2σ (above = short the spread)
//! - Exit: signal back at or through the mean
//!
//! The leg with the lower level at entry is held long for the whole position.
//! Nothing is realised on the entry step; every later open step realises
//! r_long - r_short, including the step that closes the position.

use serde::{Deserialize, Serialize};

use crate::domain::{BacktestError, Leg, OpenPosition, Pair, SignalState};

/// Entry band width in formation standard deviations
pub const ENTRY_SIGMA: f64 = 2.0;

/// Entry and exit levels derived from formation moments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub mean: f64,
    pub std: f64,
    pub upper: f64,
    pub lower: f64,
}

impl Thresholds {
    pub fn new(mean: f64, std: f64) -> Result<Self, BacktestError> {
        if !mean.is_finite() || !std.is_finite() || std < 0.0 {
            return Err(BacktestError::InvalidArgument(format!(
                "invalid signal moments: mean={} std={}",
                mean, std
            )));
        }
        Ok(Self {
            mean,
            std,
            upper: mean + ENTRY_SIGMA * std,
            lower: mean - ENTRY_SIGMA * std,
        })
    }

    pub fn for_pair(pair: &Pair) -> Result<Self, BacktestError> {
        Self::new(pair.spread_mean, pair.spread_std)
            .map_err(|e| e.for_pair(pair.asset_a.as_str(), pair.asset_b.as_str()))
    }
}

/// Aligned per-step inputs of one pair over the trading window
#[derive(Debug, Clone, Copy)]
pub struct TradingWindow<'a> {
    /// Value compared against the thresholds
    pub signal: &'a [f64],
    /// Leg levels used to pick the long leg at entry
    pub levels_a: &'a [f64],
    pub levels_b: &'a [f64],
    /// Simple returns realised while a position is open
    pub returns_a: &'a [f64],
    pub returns_b: &'a [f64],
}

impl TradingWindow<'_> {
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    fn validate(&self) -> Result<(), BacktestError> {
        let n = self.signal.len();
        if n == 0 {
            return Err(BacktestError::InvalidArgument("trading window is empty".into()));
        }
        let lengths = [
            self.levels_a.len(),
            self.levels_b.len(),
            self.returns_a.len(),
            self.returns_b.len(),
        ];
        if lengths.iter().any(|&l| l != n) {
            return Err(BacktestError::InvalidArgument(format!(
                "trading inputs are misaligned: signal has {} steps, legs have {:?}",
                n, lengths
            )));
        }
        if let Some(t) = self.signal.iter().position(|v| !v.is_finite()) {
            return Err(BacktestError::InvalidArgument(format!(
                "signal is not finite at step {}",
                t
            )));
        }
        Ok(())
    }
}

/// One opened position, closed or still open when the window ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub direction: SignalState,
    pub entry_step: usize,
    pub exit_step: Option<usize>,
    pub long_leg: Leg,
    pub short_leg: Leg,
    /// Compounded return over the holding period
    pub total_return: f64,
}

impl RoundTrip {
    fn from_position(position: &OpenPosition, exit_step: Option<usize>) -> Self {
        Self {
            direction: position.direction,
            entry_step: position.entry_step,
            exit_step,
            long_leg: position.long_leg,
            short_leg: position.short_leg,
            total_return: position.accrued,
        }
    }
}

/// Per-step simulation output, aligned with the trading window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub returns: Vec<f64>,
    pub states: Vec<SignalState>,
    pub round_trips: Vec<RoundTrip>,
}

impl TradeOutcome {
    pub fn trade_count(&self) -> usize {
        self.round_trips.len()
    }
}

/// State machine for one pair; never shared across pairs
#[derive(Debug, Clone)]
pub struct SpreadTrader {
    thresholds: Thresholds,
    state: SignalState,
    position: Option<OpenPosition>,
}

impl SpreadTrader {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: SignalState::Flat,
            position: None,
        }
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        self.position.as_ref()
    }

    /// Evaluate step `t`; returns the realised return and a round trip if one closed
    pub fn step(
        &mut self,
        t: usize,
        window: &TradingWindow<'_>,
    ) -> Result<(f64, Option<RoundTrip>), BacktestError> {
        let v = window.signal[t];
        let th = self.thresholds;

        match self.position.as_mut() {
            None => {
                let direction = if v >= th.upper {
                    SignalState::ShortSpread
                } else if v <= th.lower {
                    SignalState::LongSpread
                } else {
                    return Ok((0.0, None));
                };
                let position =
                    OpenPosition::open(direction, window.levels_a[t], window.levels_b[t], t)
                        .map_err(|e| BacktestError::InvalidArgument(format!("step {}: {}", t, e)))?;
                self.position = Some(position);
                self.state = direction;
                Ok((0.0, None))
            }
            Some(position) => {
                let realized = position.realize(window.returns_a[t], window.returns_b[t]);
                let converged = match position.direction {
                    SignalState::LongSpread => v >= th.mean,
                    _ => v <= th.mean,
                };
                if !converged {
                    return Ok((realized, None));
                }
                let trip = RoundTrip::from_position(position, Some(t));
                self.position = None;
                self.state = SignalState::Flat;
                Ok((realized, Some(trip)))
            }
        }
    }
}

/// Run the state machine over a whole trading window. Step 0 is seeded Flat
/// with a zero return; transitions are evaluated from step 1.
pub fn simulate(thresholds: Thresholds, window: &TradingWindow<'_>) -> Result<TradeOutcome, BacktestError> {
    window.validate()?;

    let mut trader = SpreadTrader::new(thresholds);
    let mut outcome = TradeOutcome {
        returns: Vec::with_capacity(window.len()),
        states: Vec::with_capacity(window.len()),
        round_trips: Vec::new(),
    };
    outcome.returns.push(0.0);
    outcome.states.push(SignalState::Flat);

    for t in 1..window.len() {
        let (realized, closed) = trader.step(t, window)?;
        outcome.returns.push(realized);
        outcome.states.push(trader.state());
        if let Some(trip) = closed {
            outcome.round_trips.push(trip);
        }
    }

    if let Some(position) = trader.position() {
        outcome.round_trips.push(RoundTrip::from_position(position, None));
    }

    Ok(outcome)
}
