//! Temporal Classifier Inference
//!
//! Maps a full window of normalized feature vectors to a drowsiness
//! probability. The classifier itself is opaque; this crate provides the
//! seam, an ONNX backend using tract, and a rule-based mock.

mod engine;
mod heuristic;
mod onnx;

pub use engine::{InferenceEngine, InferenceResult};
pub use heuristic::HeuristicClassifier;
pub use onnx::OnnxClassifier;

use ndarray::ArrayView2;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

/// Sequence classifier over a `timesteps × features` window
pub trait TemporalClassifier: Send {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Expected (timesteps, features)
    fn input_shape(&self) -> (usize, usize);

    /// Drowsiness probability in [0, 1] for a window, oldest row first
    fn predict(&mut self, window: ArrayView2<'_, f32>) -> Result<f64, InferenceError>;
}
