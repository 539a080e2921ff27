//! Tick Clock

use crate::FeatureError;
use serde::{Deserialize, Serialize};

/// Fixed nominal tick rate; every frame-count threshold is derived from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickRate {
    fps: f64,
}

impl TickRate {
    /// Create a tick rate in Hz
    pub fn new(fps: f64) -> Result<Self, FeatureError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FeatureError::InvalidTickRate(fps));
        }
        Ok(Self { fps })
    }

    /// Frames per second
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Nominal tick duration in seconds
    pub fn dt(&self) -> f64 {
        1.0 / self.fps
    }

    /// Number of whole frames covering `seconds` at this rate (rounded)
    pub fn frames_for(&self, seconds: f64) -> usize {
        (seconds * self.fps).round().max(0.0) as usize
    }

    /// Duration in seconds of `frames` ticks
    pub fn seconds_for(&self, frames: usize) -> f64 {
        frames as f64 * self.dt()
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self { fps: 15.0 }
    }
}

/// One accepted tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Frame index, counting accepted ticks from session start
    pub frame: u64,
    /// Caller-supplied monotonic timestamp (seconds)
    pub timestamp_s: f64,
}

/// Monotonic tick clock
///
/// Ticks may skip timestamps but never go backwards.
#[derive(Debug, Clone)]
pub struct Clock {
    rate: TickRate,
    last: Option<Tick>,
}

impl Clock {
    pub fn new(rate: TickRate) -> Self {
        Self { rate, last: None }
    }

    /// Check that `timestamp_s` may follow the previous tick, without advancing
    pub fn check(&self, timestamp_s: f64) -> Result<(), FeatureError> {
        if !timestamp_s.is_finite() {
            return Err(FeatureError::NonFiniteTimestamp);
        }
        match self.last {
            Some(prev) if timestamp_s <= prev.timestamp_s => Err(FeatureError::OutOfOrderTick {
                previous: prev.timestamp_s,
                current: timestamp_s,
            }),
            _ => Ok(()),
        }
    }

    /// Accept the next tick
    pub fn advance(&mut self, timestamp_s: f64) -> Result<Tick, FeatureError> {
        self.check(timestamp_s)?;
        let frame = self.last.map_or(0, |t| t.frame + 1);
        let tick = Tick { frame, timestamp_s };
        self.last = Some(tick);
        Ok(tick)
    }

    /// Most recently accepted tick
    pub fn last(&self) -> Option<Tick> {
        self.last
    }

    pub fn rate(&self) -> TickRate {
        self.rate
    }
}
