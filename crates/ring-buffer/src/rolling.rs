//! Rolling Average over a fixed number of samples

use crate::RingBuffer;

/// Mean of the most recent `capacity` samples, maintained with a running sum.
///
/// `mean()` always equals `sum / count` over the resident samples. The sum is
/// rebuilt from the resident samples once per full turn of the buffer so that
/// floating-point drift from add/subtract pairs cannot accumulate.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    samples: RingBuffer<f64>,
    sum: f64,
    pushes_since_resync: usize,
}

impl RollingAverage {
    /// Create a rolling average over `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RingBuffer::new(capacity),
            sum: 0.0,
            pushes_since_resync: 0,
        }
    }

    /// Add a sample, evicting the oldest when full
    pub fn push(&mut self, value: f64) {
        if let Some(evicted) = self.samples.push(value) {
            self.sum -= evicted;
        }
        self.sum += value;

        self.pushes_since_resync += 1;
        if self.pushes_since_resync >= self.samples.capacity() {
            self.sum = self.samples.iter().sum();
            self.pushes_since_resync = 0;
        }
    }

    /// Add a boolean sample as 1.0 / 0.0
    pub fn push_flag(&mut self, flag: bool) {
        self.push(if flag { 1.0 } else { 0.0 });
    }

    /// Mean of the resident samples (0.0 when empty)
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    /// Running sum of the resident samples
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of resident samples
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Window capacity in samples
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.pushes_since_resync = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_mean_is_zero() {
        let avg = RollingAverage::new(10);
        assert_eq!(avg.mean(), 0.0);
        assert_eq!(avg.count(), 0);
    }

    #[test]
    fn test_flag_window() {
        let mut avg = RollingAverage::new(4);
        for flag in [true, true, false, false] {
            avg.push_flag(flag);
        }
        assert!((avg.mean() - 0.5).abs() < 1e-12);

        // Two more open samples push both closed ones out
        avg.push_flag(false);
        avg.push_flag(false);
        assert_eq!(avg.mean(), 0.0);
        assert_eq!(avg.count(), 4);
    }

    #[test]
    fn test_perclos_capacity() {
        let mut avg = RollingAverage::new(450);
        for i in 0..1000 {
            avg.push_flag(i % 3 == 0);
        }
        assert_eq!(avg.count(), 450);
        let expected = (550..1000).filter(|i| i % 3 == 0).count() as f64 / 450.0;
        assert!((avg.mean() - expected).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_mean_matches_trailing_window(
            capacity in 1usize..50,
            values in prop::collection::vec(-100.0f64..100.0, 1..400),
        ) {
            let mut avg = RollingAverage::new(capacity);
            for (i, &v) in values.iter().enumerate() {
                avg.push(v);
                let start = (i + 1).saturating_sub(capacity);
                let window = &values[start..=i];
                let expected = window.iter().sum::<f64>() / window.len() as f64;
                prop_assert_eq!(avg.count(), window.len());
                prop_assert!((avg.mean() - expected).abs() < 1e-9);
            }
        }
    }
}
