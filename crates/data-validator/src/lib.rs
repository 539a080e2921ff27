//! Data Validation and Normalization
//!
//! Provides finite-or-default sanitizing of per-frame probe outputs and the
//! session-scoped z-score baseline for feature vectors.

mod error;
mod normalizer;
mod validator;

pub use error::ValidationError;
pub use normalizer::{
    BaselineNormalizer, NormalizationStats, NormalizationStatus, NormalizerConfig,
};
pub use validator::{RawFrame, SanitizedFrame, ValidationConfig, ValidationResult, Validator};
