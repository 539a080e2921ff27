//! ONNX sequence classifier backed by tract

use crate::{InferenceError, TemporalClassifier};
use ndarray::ArrayView2;
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

type Plan = TypedRunnableModel<TypedModel>;

/// Classifier loaded from an ONNX file with input `[1, timesteps, features]`
/// (f32) and a probability output whose last element is the drowsy class
pub struct OnnxClassifier {
    plan: Plan,
    timesteps: usize,
    features: usize,
    model_path: String,
}

impl OnnxClassifier {
    /// Load and optimize a model for a fixed window shape
    pub fn load(
        path: impl AsRef<Path>,
        timesteps: usize,
        features: usize,
    ) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading temporal classifier from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, timesteps, features]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e}", path.display())))?;

        Ok(Self {
            plan,
            timesteps,
            features,
            model_path: path.display().to_string(),
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

impl TemporalClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn input_shape(&self) -> (usize, usize) {
        (self.timesteps, self.features)
    }

    fn predict(&mut self, window: ArrayView2<'_, f32>) -> Result<f64, InferenceError> {
        let data: Vec<f32> = window.iter().copied().collect();
        let input = Tensor::from_shape(&[1, self.timesteps, self.features], &data)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let values = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let probability = values
            .iter()
            .last()
            .copied()
            .ok_or_else(|| InferenceError::InferenceFailed("empty model output".into()))?;

        debug!("ONNX output {:?} -> {}", values.shape(), probability);
        Ok(f64::from(probability).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_to_load() {
        let result = OnnxClassifier::load("/nonexistent/drowsiness.onnx", 90, 20);
        assert!(matches!(result, Err(InferenceError::ModelLoadError(_))));
    }
}
