use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::signal::SignalState;

/// One side of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    A,
    B,
}

impl Leg {
    pub fn other(&self) -> Leg {
        match self {
            Leg::A => Leg::B,
            Leg::B => Leg::A,
        }
    }

    /// Pick this leg's value from an (A, B) tuple
    pub fn pick(&self, a: f64, b: f64) -> f64 {
        match self {
            Leg::A => a,
            Leg::B => b,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("Cannot open a position in state {0}")]
    InvalidDirection(SignalState),
    #[error("Invalid leg level: {0}")]
    InvalidLevel(f64),
}

/// Open pair position; leg assignment is fixed at entry and never re-evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub direction: SignalState,
    /// The "loser" leg (lower level at entry)
    pub long_leg: Leg,
    /// The "winner" leg (higher level at entry)
    pub short_leg: Leg,
    pub entry_step: usize,
    /// Compounded return accumulated since entry
    pub accrued: f64,
}

impl OpenPosition {
    /// Open at `entry_step`; the lower of the two leg levels becomes the long leg.
    /// Equal levels fall back to the direction (LongSpread longs A).
    pub fn open(
        direction: SignalState,
        level_a: f64,
        level_b: f64,
        entry_step: usize,
    ) -> Result<Self, PositionError> {
        if !direction.is_open() {
            return Err(PositionError::InvalidDirection(direction));
        }
        if !level_a.is_finite() {
            return Err(PositionError::InvalidLevel(level_a));
        }
        if !level_b.is_finite() {
            return Err(PositionError::InvalidLevel(level_b));
        }

        let long_leg = if level_a < level_b {
            Leg::A
        } else if level_b < level_a {
            Leg::B
        } else if direction == SignalState::LongSpread {
            Leg::A
        } else {
            Leg::B
        };

        Ok(Self {
            direction,
            long_leg,
            short_leg: long_leg.other(),
            entry_step,
            accrued: 0.0,
        })
    }

    /// Realise one step of leg returns; returns the step's spread return
    pub fn realize(&mut self, return_a: f64, return_b: f64) -> f64 {
        let step = self.long_leg.pick(return_a, return_b) - self.short_leg.pick(return_a, return_b);
        self.accrued = (1.0 + self.accrued) * (1.0 + step) - 1.0;
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lower_level_is_long() {
        let pos = OpenPosition::open(SignalState::ShortSpread, 0.30, 0.10, 4).unwrap();
        assert_eq!(pos.long_leg, Leg::B);
        assert_eq!(pos.short_leg, Leg::A);
        assert_eq!(pos.entry_step, 4);

        let pos = OpenPosition::open(SignalState::LongSpread, -0.2, 0.1, 0).unwrap();
        assert_eq!(pos.long_leg, Leg::A);
    }

    #[test]
    fn test_equal_levels_follow_direction() {
        let long = OpenPosition::open(SignalState::LongSpread, 0.0, 0.0, 0).unwrap();
        assert_eq!(long.long_leg, Leg::A);
        let short = OpenPosition::open(SignalState::ShortSpread, 0.0, 0.0, 0).unwrap();
        assert_eq!(short.long_leg, Leg::B);
    }

    #[test]
    fn test_cannot_open_flat() {
        let result = OpenPosition::open(SignalState::Flat, 0.1, 0.2, 0);
        assert_eq!(result, Err(PositionError::InvalidDirection(SignalState::Flat)));
        assert!(OpenPosition::open(SignalState::LongSpread, f64::NAN, 0.2, 0).is_err());
    }

    #[test]
    fn test_realize_long_minus_short() {
        let mut pos = OpenPosition::open(SignalState::ShortSpread, 0.3, 0.1, 0).unwrap();
        // long B, short A
        let r = pos.realize(0.02, 0.05);
        assert_relative_eq!(r, 0.03, epsilon = 1e-12);
        let r = pos.realize(-0.01, 0.01);
        assert_relative_eq!(r, 0.02, epsilon = 1e-12);
        assert_relative_eq!(pos.accrued, 1.03 * 1.02 - 1.0, epsilon = 1e-12);
    }
}
