//! Exponential Moving Average

use serde::{Deserialize, Serialize};

/// Exponential moving average with a fixed coefficient.
///
/// The state is empty until the first sample, which initializes it directly
/// instead of blending toward an arbitrary starting value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// Create an EMA with smoothing coefficient `alpha` in (0, 1]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            value: None,
        }
    }

    /// EMA for time constant `tau_s` sampled every `dt_s`: alpha = 1 - e^(-dt/tau)
    pub fn from_time_constant(tau_s: f64, dt_s: f64) -> Self {
        Self::new(1.0 - (-dt_s / tau_s).exp())
    }

    /// Blend in a sample and return the updated value
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(prev) => prev + self.alpha * (sample - prev),
            None => sample,
        };
        self.value = Some(next);
        next
    }

    /// Blend in `sample` when present, otherwise hold the current value.
    /// Before the first sample, `fallback` is reported and nothing is stored.
    pub fn update_or_hold(&mut self, sample: Option<f64>, fallback: f64) -> f64 {
        match sample {
            Some(sample) => self.update(sample),
            None => self.value.unwrap_or(fallback),
        }
    }

    /// Current value, if any sample has been seen
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_initializes() {
        let mut ema = Ema::from_time_constant(1.0, 1.0 / 15.0);
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update(0.9), 0.9);
    }

    #[test]
    fn test_missing_sample_does_not_seed() {
        let mut ema = Ema::new(0.5);
        assert_eq!(ema.update_or_hold(None, 0.5), 0.5);
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update_or_hold(Some(0.9), 0.5), 0.9);
        assert_eq!(ema.update_or_hold(None, 0.5), 0.9);
        assert_eq!(ema.update_or_hold(Some(0.1), 0.5), 0.5);
    }

    #[test]
    fn test_time_constant_coefficient() {
        let ema = Ema::from_time_constant(5.0, 1.0 / 15.0);
        let expected = 1.0 - (-1.0f64 / 75.0).exp();
        assert!((ema.alpha() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_step() {
        let mut ema = Ema::new(0.3);
        ema.update(0.0);
        for _ in 0..100 {
            ema.update(1.0);
        }
        assert!((ema.value().unwrap() - 1.0).abs() < 1e-9);
    }
}
