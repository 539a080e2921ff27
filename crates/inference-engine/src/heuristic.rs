//! Rule-based mock classifier
//!
//! Used when no model is configured. Scores the window from the features
//! that track drowsiness most directly: PERCLOS, ongoing closure duration,
//! yawn EMA and sustained head drop. Expects raw-scale features, so it is
//! most meaningful with normalization disabled.

use crate::{InferenceError, TemporalClassifier};
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use ndarray::{ArrayView2, Axis};

/// Weighted-rule drowsiness score
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    timesteps: usize,
    perclos_idx: usize,
    closure_idx: usize,
    yawn_idx: usize,
    pitch_idx: usize,
}

impl HeuristicClassifier {
    pub fn new(timesteps: usize) -> Self {
        let idx = |name: &str| FeatureVector::index_of(name).unwrap_or(0);
        Self {
            timesteps,
            perclos_idx: idx("perclos_30s"),
            closure_idx: idx("eye_closure_duration_s"),
            yawn_idx: idx("yawn_ema"),
            pitch_idx: idx("pitch"),
        }
    }

    /// Score from window column means
    fn score(&self, window: &ArrayView2<'_, f32>) -> f64 {
        let Some(means) = window.mean_axis(Axis(0)) else {
            return 0.0;
        };
        let column = |i: usize| f64::from(means[i]);

        // PERCLOS of 0.3 or more is the classic fatigue mark
        let perclos = (column(self.perclos_idx) / 0.3).clamp(0.0, 1.0);
        let closure = (column(self.closure_idx) / 2.0).clamp(0.0, 1.0);
        let yawn = column(self.yawn_idx).clamp(0.0, 1.0);
        let head_drop = (-column(self.pitch_idx) / 15.0).clamp(0.0, 1.0);

        (0.55 * perclos + 0.2 * closure + 0.15 * yawn + 0.1 * head_drop).clamp(0.0, 1.0)
    }
}

impl TemporalClassifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn input_shape(&self) -> (usize, usize) {
        (self.timesteps, FEATURE_DIMENSION)
    }

    fn predict(&mut self, window: ArrayView2<'_, f32>) -> Result<f64, InferenceError> {
        Ok(self.score(&window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use proptest::prelude::*;

    fn window_with(name: &str, value: f32) -> Array2<f32> {
        let mut window = Array2::<f32>::zeros((90, FEATURE_DIMENSION));
        let idx = FeatureVector::index_of(name).unwrap();
        window.column_mut(idx).fill(value);
        window
    }

    #[test]
    fn test_alert_window_scores_low() {
        let mut classifier = HeuristicClassifier::new(90);
        let p = classifier.predict(window_with("perclos_30s", 0.02).view()).unwrap();
        assert!(p < 0.1);
    }

    #[test]
    fn test_high_perclos_scores_high() {
        let mut classifier = HeuristicClassifier::new(90);
        let mut window = window_with("perclos_30s", 0.45);
        let closure = FeatureVector::index_of("eye_closure_duration_s").unwrap();
        window.column_mut(closure).fill(2.5);

        let p = classifier.predict(window.view()).unwrap();
        assert!(p >= 0.65, "p = {p}");
        assert!(p <= 1.0);
    }

    proptest! {
        #[test]
        fn prop_score_is_probability(values in prop::collection::vec(-50.0f32..50.0, 90 * FEATURE_DIMENSION)) {
            let window = Array2::from_shape_vec((90, FEATURE_DIMENSION), values).unwrap();
            let mut classifier = HeuristicClassifier::new(90);
            let p = classifier.predict(window.view()).unwrap();
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
