//! Feature Vector Assembly

use crate::pose::PoseSample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 20;

/// Name and fallback value for one feature slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSlot {
    pub name: &'static str,
    /// Substituted when the upstream value is not finite
    pub default: f64,
}

const fn slot(name: &'static str, default: f64) -> FeatureSlot {
    FeatureSlot { name, default }
}

/// Fixed feature order shared with the temporal classifier.
///
/// Openness-like eye signals fall back to 0.5; everything else to 0.0.
pub const FEATURE_SCHEMA: [FeatureSlot; FEATURE_DIMENSION] = [
    // Pose (baseline-relative degrees, smoothed deg/s)
    slot("yaw", 0.0),
    slot("pitch", 0.0),
    slot("roll", 0.0),
    slot("d_yaw", 0.0),
    slot("d_pitch", 0.0),
    slot("d_roll", 0.0),
    // Eye openness
    slot("eye_openness", 0.5),
    slot("eye_ema_short", 0.5),
    slot("eye_ema_long", 0.5),
    slot("eye_trend", 0.0),
    // Eye closure statistics
    slot("eye_closure_duration_s", 0.0),
    slot("eye_closed_run_frames", 0.0),
    slot("perclos_30s", 0.0),
    slot("blink_rate_30s", 0.0),
    slot("max_close_run_10s", 0.0),
    slot("time_since_last_blink_s", 0.0),
    // Mouth
    slot("yawn_ema", 0.0),
    slot("mouth_open_duration_s", 0.0),
    slot("mouth_open_rate_30s", 0.0),
    slot("time_since_last_yawn_s", 0.0),
];

/// Feature vector for temporal inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature values in [`FEATURE_SCHEMA`] order
    pub values: [f64; FEATURE_DIMENSION],
}

impl Default for FeatureVector {
    fn default() -> Self {
        let mut values = [0.0; FEATURE_DIMENSION];
        for (value, slot) in values.iter_mut().zip(FEATURE_SCHEMA.iter()) {
            *value = slot.default;
        }
        Self { values }
    }
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_DIMENSION]) -> Self {
        Self { values }
    }

    /// Look up a feature by schema name
    pub fn get(&self, name: &str) -> Option<f64> {
        Self::index_of(name).map(|i| self.values[i])
    }

    /// Schema position of a feature name
    pub fn index_of(name: &str) -> Option<usize> {
        FEATURE_SCHEMA.iter().position(|slot| slot.name == name)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Upstream signals for one tick, grouped the way the schema orders them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureInputs {
    pub pose: PoseSample,

    pub eye_openness: f64,
    pub eye_ema_short: f64,
    pub eye_ema_long: f64,
    pub eye_trend: f64,

    pub eye_closure_duration_s: f64,
    pub eye_closed_run_frames: f64,
    pub perclos_30s: f64,
    pub blink_rate_30s: f64,
    pub max_close_run_10s: f64,
    pub time_since_last_blink_s: f64,

    pub yawn_ema: f64,
    pub mouth_open_duration_s: f64,
    pub mouth_open_rate_30s: f64,
    pub time_since_last_yawn_s: f64,
}

/// Builds schema-ordered feature vectors, replacing non-finite values with
/// the per-feature default
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the vector for one tick
    pub fn assemble(&self, inputs: &FeatureInputs) -> FeatureVector {
        let p = &inputs.pose;
        let raw = [
            p.yaw,
            p.pitch,
            p.roll,
            p.d_yaw,
            p.d_pitch,
            p.d_roll,
            inputs.eye_openness,
            inputs.eye_ema_short,
            inputs.eye_ema_long,
            inputs.eye_trend,
            inputs.eye_closure_duration_s,
            inputs.eye_closed_run_frames,
            inputs.perclos_30s,
            inputs.blink_rate_30s,
            inputs.max_close_run_10s,
            inputs.time_since_last_blink_s,
            inputs.yawn_ema,
            inputs.mouth_open_duration_s,
            inputs.mouth_open_rate_30s,
            inputs.time_since_last_yawn_s,
        ];

        let mut values = raw;
        for (value, slot) in values.iter_mut().zip(FEATURE_SCHEMA.iter()) {
            if !value.is_finite() {
                debug!("Feature {} not finite ({}), using {}", slot.name, value, slot.default);
                *value = slot.default;
            }
        }

        FeatureVector { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_are_unique() {
        for (i, a) in FEATURE_SCHEMA.iter().enumerate() {
            for b in &FEATURE_SCHEMA[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_feature_order() {
        let assembler = FeatureAssembler::new();
        let inputs = FeatureInputs {
            pose: PoseSample {
                yaw: 1.0,
                d_roll: 6.0,
                ..Default::default()
            },
            eye_openness: 0.9,
            perclos_30s: 0.25,
            time_since_last_yawn_s: 30.0,
            ..Default::default()
        };

        let features = assembler.assemble(&inputs);
        assert_eq!(features.values[0], 1.0);
        assert_eq!(features.values[5], 6.0);
        assert_eq!(features.get("eye_openness"), Some(0.9));
        assert_eq!(features.get("perclos_30s"), Some(0.25));
        assert_eq!(features.values[FEATURE_DIMENSION - 1], 30.0);
        assert_eq!(features.get("unknown"), None);
    }

    #[test]
    fn test_non_finite_replaced_with_defaults() {
        let assembler = FeatureAssembler::new();
        let inputs = FeatureInputs {
            pose: PoseSample {
                pitch: f64::NAN,
                ..Default::default()
            },
            eye_openness: f64::NAN,
            eye_ema_long: f64::INFINITY,
            yawn_ema: f64::NEG_INFINITY,
            ..Default::default()
        };

        let features = assembler.assemble(&inputs);
        assert!(features.is_finite());
        assert_eq!(features.get("pitch"), Some(0.0));
        assert_eq!(features.get("eye_openness"), Some(0.5));
        assert_eq!(features.get("eye_ema_long"), Some(0.5));
        assert_eq!(features.get("yawn_ema"), Some(0.0));
        assert_eq!(features.get("eye_ema_short"), Some(0.0));
    }
}
