//! Per-frame input validation
//!
//! Probe outputs may be missing, NaN, or slightly out of range. Nothing
//! here fails: each field is repaired to a documented value and the repair
//! is reported alongside the sanitized frame.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Head angle valid range (degrees)
    pub angle_range_deg: (f64, f64),
    /// Probability valid range
    pub probability_range: (f64, f64),
    /// Substitute for a missing/non-finite eye-openness probability
    pub eye_openness_default: f64,
    /// Substitute for a missing/non-finite yawn probability
    pub yawn_probability_default: f64,
    /// Substitute for a missing/non-finite head angle (degrees)
    pub angle_default_deg: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            angle_range_deg: (-180.0, 180.0),
            probability_range: (0.0, 1.0),
            eye_openness_default: 0.5,
            yawn_probability_default: 0.0,
            angle_default_deg: 0.0,
        }
    }
}

/// Raw collaborator outputs for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub yaw_deg: Option<f64>,
    pub pitch_deg: Option<f64>,
    pub roll_deg: Option<f64>,
    /// Eye-openness probability in [0, 1]
    pub eye_openness: Option<f64>,
    /// Mouth/yawn-openness probability in [0, 1]
    pub yawn_probability: Option<f64>,
}

impl RawFrame {
    pub fn new(yaw: f64, pitch: f64, roll: f64, eye_openness: f64, yawn_probability: f64) -> Self {
        Self {
            yaw_deg: Some(yaw),
            pitch_deg: Some(pitch),
            roll_deg: Some(roll),
            eye_openness: Some(eye_openness),
            yawn_probability: Some(yawn_probability),
        }
    }
}

/// Frame with every field finite and in range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanitizedFrame {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub eye_openness: f64,
    pub yawn_probability: f64,
    /// All three angles came from the probe unmodified
    pub pose_valid: bool,
    /// Eye openness came from the probe (possibly clamped) rather than the default
    pub eye_observed: bool,
    /// Yawn probability came from the probe (possibly clamped) rather than the default
    pub yawn_observed: bool,
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Sanitized frame
    pub frame: SanitizedFrame,
    /// Repairs applied (empty when the frame was clean)
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Whether all values were valid as received
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Data validator for per-frame probe outputs
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            Err(ValidationError::NonFinite { field, value })
        } else if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate and repair a raw frame
    pub fn sanitize(&self, raw: &RawFrame) -> ValidationResult {
        let mut errors = Vec::new();

        let range = self.config.angle_range_deg;
        let default = self.config.angle_default_deg;
        let angle = |field, value: Option<f64>, errors: &mut Vec<ValidationError>| {
            self.repair(field, value, range, default, false, errors)
        };
        let yaw_deg = angle("yaw", raw.yaw_deg, &mut errors);
        let pitch_deg = angle("pitch", raw.pitch_deg, &mut errors);
        let roll_deg = angle("roll", raw.roll_deg, &mut errors);
        let pose_valid = errors.is_empty();

        let eye_openness = self.repair(
            "eye_openness",
            raw.eye_openness,
            self.config.probability_range,
            self.config.eye_openness_default,
            true,
            &mut errors,
        );
        let yawn_probability = self.repair(
            "yawn_probability",
            raw.yawn_probability,
            self.config.probability_range,
            self.config.yawn_probability_default,
            true,
            &mut errors,
        );

        ValidationResult {
            frame: SanitizedFrame {
                yaw_deg,
                pitch_deg,
                roll_deg,
                eye_openness,
                yawn_probability,
                pose_valid,
                eye_observed: raw.eye_openness.is_some_and(f64::is_finite),
                yawn_observed: raw.yawn_probability.is_some_and(f64::is_finite),
            },
            errors,
            fields_checked: 5,
        }
    }

    /// Missing/non-finite → default; out of range → clamped when `clamp`, else default
    fn repair(
        &self,
        field: &'static str,
        value: Option<f64>,
        range: (f64, f64),
        default: f64,
        clamp: bool,
        errors: &mut Vec<ValidationError>,
    ) -> f64 {
        let Some(value) = value else {
            errors.push(ValidationError::MissingField(field));
            return default;
        };

        match self.validate_range(field, value, range) {
            Ok(()) => value,
            Err(err) => {
                let repaired = match err {
                    ValidationError::OutOfRange { .. } if clamp => value.clamp(range.0, range.1),
                    _ => default,
                };
                errors.push(err);
                repaired
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
