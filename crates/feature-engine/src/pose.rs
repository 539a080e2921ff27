//! Head Pose Smoothing
//!
//! Each axis keeps the five most recent angles. The angular rate is a
//! central difference over the latest sample and the one two ticks older
//! (forward difference with only two samples, zero with fewer), then
//! smoothed with a persistent per-axis EMA.

use crate::ema::Ema;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};

/// Angles kept per axis
pub const POSE_HISTORY_LEN: usize = 5;

/// Smoothing coefficient for angular rates
pub const RATE_SMOOTHING: f64 = 0.3;

/// Head rotation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Yaw,
    Pitch,
    Roll,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Yaw, Axis::Pitch, Axis::Roll];

    fn index(self) -> usize {
        match self {
            Axis::Yaw => 0,
            Axis::Pitch => 1,
            Axis::Roll => 2,
        }
    }
}

/// Angle and smoothed rate for one axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisEstimate {
    /// Angle in degrees (unsmoothed)
    pub angle: f64,
    /// Smoothed angular rate in degrees/second
    pub rate: f64,
}

/// Head pose with angular rates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub d_yaw: f64,
    pub d_pitch: f64,
    pub d_roll: f64,
}

#[derive(Debug, Clone)]
struct AxisTrack {
    history: RingBuffer<f64>,
    rate: Ema,
}

impl AxisTrack {
    fn new() -> Self {
        Self {
            history: RingBuffer::new(POSE_HISTORY_LEN),
            rate: Ema::new(RATE_SMOOTHING),
        }
    }

    fn update(&mut self, angle: f64, dt: f64) -> AxisEstimate {
        self.history.push(angle);

        let n = self.history.len();
        let raw_rate = match n {
            0 | 1 => 0.0,
            2 => (self.history[1] - self.history[0]) / dt,
            _ => (self.history[n - 1] - self.history[n - 3]) / (2.0 * dt),
        };

        AxisEstimate {
            angle,
            rate: self.rate.update(raw_rate),
        }
    }
}

/// Per-axis pose history, derivative and rate smoother
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    axes: [AxisTrack; 3],
    dt: f64,
}

impl PoseSmoother {
    /// Create a smoother for ticks of `dt` seconds
    pub fn new(dt: f64) -> Self {
        Self {
            axes: [AxisTrack::new(), AxisTrack::new(), AxisTrack::new()],
            dt,
        }
    }

    /// Feed one axis
    pub fn update_axis(&mut self, axis: Axis, angle: f64) -> AxisEstimate {
        self.axes[axis.index()].update(angle, self.dt)
    }

    /// Feed all three axes for the current tick
    pub fn update(&mut self, yaw: f64, pitch: f64, roll: f64) -> PoseSample {
        let y = self.update_axis(Axis::Yaw, yaw);
        let p = self.update_axis(Axis::Pitch, pitch);
        let r = self.update_axis(Axis::Roll, roll);
        PoseSample {
            yaw: y.angle,
            pitch: p.angle,
            roll: r.angle,
            d_yaw: y.rate,
            d_pitch: p.rate,
            d_roll: r.rate,
        }
    }

    /// Number of angles held for `axis`
    pub fn history_len(&self, axis: Axis) -> usize {
        self.axes[axis.index()].history.len()
    }
}
