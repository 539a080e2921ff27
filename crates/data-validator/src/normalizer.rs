//! Session Baseline Normalization
//!
//! For a fixed window at session start, per-feature count, sum and sum of
//! squares are accumulated. When the window elapses the baseline is either
//! finalized into immutable mean/stddev or, with too few samples, reported
//! unstable; the session then continues unnormalized.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Baseline collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Collection window measured from the first absorbed sample (seconds)
    pub window_s: f64,
    /// Minimum samples for a stable baseline
    pub min_samples: usize,
    /// Lower bound on the estimated variance
    pub variance_floor: f64,
    /// Lower bound on the divisor when normalizing
    pub std_dev_floor: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            window_s: 10.0,
            min_samples: 60,
            variance_floor: 1e-6,
            std_dev_floor: 1e-3,
        }
    }
}

/// Finalized per-feature baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
    /// Samples the baseline was estimated from
    pub samples: usize,
}

/// Where the baseline is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NormalizationStatus {
    /// Normalization switched off for this session (identity)
    Disabled,
    /// Accumulating samples
    Collecting { samples: usize, elapsed_s: f64, window_s: f64 },
    /// Baseline finalized and applied
    Ready { samples: usize },
    /// Too few samples; session proceeds unnormalized
    Unstable { samples: usize, required: usize },
}

#[derive(Debug, Clone)]
enum Phase {
    Disabled,
    Collecting {
        start_s: Option<f64>,
        elapsed_s: f64,
        count: usize,
        sum: Vec<f64>,
        sum_sq: Vec<f64>,
    },
    Ready(NormalizationStats),
    Unstable { samples: usize },
}

/// Online mean/variance baseline used to z-score feature vectors
#[derive(Debug, Clone)]
pub struct BaselineNormalizer {
    config: NormalizerConfig,
    dimension: usize,
    phase: Phase,
}

impl BaselineNormalizer {
    /// Create a normalizer for vectors of `dimension` features
    pub fn new(config: NormalizerConfig, dimension: usize, enabled: bool) -> Self {
        let phase = if enabled {
            Self::collecting(dimension)
        } else {
            Phase::Disabled
        };
        Self {
            config,
            dimension,
            phase,
        }
    }

    fn collecting(dimension: usize) -> Phase {
        Phase::Collecting {
            start_s: None,
            elapsed_s: 0.0,
            count: 0,
            sum: vec![0.0; dimension],
            sum_sq: vec![0.0; dimension],
        }
    }

    /// Absorb one raw vector while collecting; finalizes once the window has elapsed
    pub fn absorb(
        &mut self,
        values: &[f64],
        timestamp_s: f64,
    ) -> Result<NormalizationStatus, ValidationError> {
        self.check_dimension(values)?;

        let window_elapsed = match &mut self.phase {
            Phase::Collecting {
                start_s,
                elapsed_s,
                count,
                sum,
                sum_sq,
            } => {
                let start = *start_s.get_or_insert(timestamp_s);
                *elapsed_s = timestamp_s - start;
                *count += 1;
                for ((s, sq), &v) in sum.iter_mut().zip(sum_sq.iter_mut()).zip(values) {
                    *s += v;
                    *sq += v * v;
                }
                *elapsed_s >= self.config.window_s
            }
            _ => false,
        };

        if window_elapsed {
            // Insufficient data is reported through the status, not as an error
            let _ = self.finalize();
        }
        Ok(self.status())
    }

    /// Close the collection window now.
    ///
    /// With fewer than `min_samples` samples the baseline is discarded and
    /// the normalizer becomes unstable (identity).
    pub fn finalize(&mut self) -> Result<NormalizationStats, ValidationError> {
        let (count, sum, sum_sq) = match &self.phase {
            Phase::Collecting {
                count, sum, sum_sq, ..
            } => (*count, sum, sum_sq),
            Phase::Ready(stats) => return Ok(stats.clone()),
            Phase::Unstable { samples } => {
                return Err(ValidationError::InsufficientSamples {
                    samples: *samples,
                    required: self.config.min_samples,
                })
            }
            Phase::Disabled => {
                return Err(ValidationError::InsufficientSamples {
                    samples: 0,
                    required: self.config.min_samples,
                })
            }
        };

        if count < self.config.min_samples {
            warn!(
                "Normalization unstable: {} samples < {} required, continuing unnormalized",
                count, self.config.min_samples
            );
            self.phase = Phase::Unstable { samples: count };
            return Err(ValidationError::InsufficientSamples {
                samples: count,
                required: self.config.min_samples,
            });
        }

        let n = count as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std_dev: Vec<f64> = sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, m)| (sq / n - m * m).max(self.config.variance_floor).sqrt())
            .collect();

        info!("Normalization baseline finalized from {} samples", count);
        debug!("Baseline mean={:?} std_dev={:?}", mean, std_dev);

        let stats = NormalizationStats {
            mean,
            std_dev,
            samples: count,
        };
        self.phase = Phase::Ready(stats.clone());
        Ok(stats)
    }

    /// Z-score `values` against the baseline; identity while no baseline exists
    pub fn normalize(&self, values: &[f64]) -> Result<Vec<f64>, ValidationError> {
        self.check_dimension(values)?;
        let normalized = match &self.phase {
            Phase::Ready(stats) => values
                .iter()
                .zip(stats.mean.iter().zip(&stats.std_dev))
                .map(|(v, (m, s))| (v - m) / s.max(self.config.std_dev_floor))
                .collect(),
            _ => values.to_vec(),
        };
        Ok(normalized)
    }

    pub fn status(&self) -> NormalizationStatus {
        match &self.phase {
            Phase::Disabled => NormalizationStatus::Disabled,
            Phase::Collecting {
                count, elapsed_s, ..
            } => NormalizationStatus::Collecting {
                samples: *count,
                elapsed_s: *elapsed_s,
                window_s: self.config.window_s,
            },
            Phase::Ready(stats) => NormalizationStatus::Ready {
                samples: stats.samples,
            },
            Phase::Unstable { samples } => NormalizationStatus::Unstable {
                samples: *samples,
                required: self.config.min_samples,
            },
        }
    }

    /// Finalized baseline, if any
    pub fn stats(&self) -> Option<&NormalizationStats> {
        match &self.phase {
            Phase::Ready(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.phase, Phase::Collecting { .. })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, values: &[f64]) -> Result<(), ValidationError> {
        if values.len() != self.dimension {
            return Err(ValidationError::DimensionMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        Ok(())
    }
}
