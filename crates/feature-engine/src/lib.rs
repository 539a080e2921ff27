//! Feature Engineering Engine
//!
//! Turns per-tick head pose and eye/mouth signals into the fixed-order
//! feature vector consumed by the temporal classifier:
//! - tick clock with a fixed nominal rate
//! - exponential smoothing with cold-start initialization
//! - per-axis pose history, derivative and rate smoothing
//! - session baseline orientation capture
//! - 20-feature schema and assembly with finite-or-default substitution

mod calibration;
mod clock;
mod ema;
mod features;
mod geometry;
mod pose;

pub use calibration::BaselineCalibrator;
pub use clock::{Clock, Tick, TickRate};
pub use ema::Ema;
pub use features::{
    FeatureAssembler, FeatureInputs, FeatureSlot, FeatureVector, FEATURE_DIMENSION,
    FEATURE_SCHEMA,
};
pub use geometry::{Axes, Mat3, Vec3};
pub use pose::{Axis, AxisEstimate, PoseSample, PoseSmoother};

use thiserror::Error;

/// Errors raised by feature computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Tick timestamp {current}s is not after previous tick at {previous}s")]
    OutOfOrderTick { previous: f64, current: f64 },
    #[error("Tick timestamp is not finite")]
    NonFiniteTimestamp,
    #[error("Invalid tick rate: {0} Hz")]
    InvalidTickRate(f64),
    #[error("Calibration axes are degenerate (zero-length or parallel)")]
    DegenerateAxes,
}
