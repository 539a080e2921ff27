//! Inference Engine Implementation

use crate::heuristic::HeuristicClassifier;
use crate::onnx::OnnxClassifier;
use crate::{InferenceError, TemporalClassifier};
use feature_engine::FEATURE_DIMENSION;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Result of one classifier invocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Drowsiness probability (0.0 to 1.0)
    pub probability: f64,
    /// Inference latency in microseconds
    pub latency_us: u64,
    /// Whether the rule-based mock produced the result
    pub mock: bool,
}

/// Owns the temporal classifier and guards its input shape
pub struct InferenceEngine {
    classifier: Box<dyn TemporalClassifier>,
    mock_mode: bool,
    inferences: u64,
}

impl InferenceEngine {
    /// Load an ONNX model, or fall back to the heuristic mock when no path is given
    pub fn new(model_path: Option<&str>, timesteps: usize) -> Result<Self, InferenceError> {
        match model_path {
            Some(path) => {
                let classifier = OnnxClassifier::load(path, timesteps, FEATURE_DIMENSION)?;
                Ok(Self::with_classifier(Box::new(classifier)))
            }
            None => Ok(Self::mock(timesteps)),
        }
    }

    /// Create a mock inference engine using the rule-based classifier
    pub fn mock(timesteps: usize) -> Self {
        info!("Creating mock inference engine");
        Self {
            classifier: Box::new(HeuristicClassifier::new(timesteps)),
            mock_mode: true,
            inferences: 0,
        }
    }

    /// Wrap any classifier
    pub fn with_classifier(classifier: Box<dyn TemporalClassifier>) -> Self {
        info!(
            "Creating inference engine with {} classifier, input {:?}",
            classifier.name(),
            classifier.input_shape()
        );
        Self {
            classifier,
            mock_mode: false,
            inferences: 0,
        }
    }

    /// Run inference on a full window
    pub fn predict(&mut self, window: ArrayView2<'_, f32>) -> Result<InferenceResult, InferenceError> {
        let expected = self.classifier.input_shape();
        let actual = window.dim();
        if actual != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            });
        }

        let start = Instant::now();
        let probability = self.classifier.predict(window)?;
        if !probability.is_finite() {
            return Err(InferenceError::InferenceFailed(format!(
                "{} returned non-finite probability",
                self.classifier.name()
            )));
        }
        let latency_us = start.elapsed().as_micros() as u64;
        self.inferences += 1;
        debug!("Inference completed in {}us: p={:.3}", latency_us, probability);

        Ok(InferenceResult {
            probability: probability.clamp(0.0, 1.0),
            latency_us,
            mock: self.mock_mode,
        })
    }

    /// Expected (timesteps, features)
    pub fn input_shape(&self) -> (usize, usize) {
        self.classifier.input_shape()
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    /// Number of successful inferences
    pub fn inferences(&self) -> u64 {
        self.inferences
    }
}
