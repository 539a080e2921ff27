//! Validation Error Types

use thiserror::Error;

/// Errors during input validation and normalization
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is NaN or infinite
    #[error("{field} is not finite: {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Feature width does not match the normalizer
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Too few calibration samples to estimate a baseline
    #[error("Insufficient calibration samples: {samples} < {required}")]
    InsufficientSamples { samples: usize, required: usize },
}
