//! DMS configuration
//!
//! Every threshold carries its unit in the field name. Frame counts are
//! derived from the tick rate once, in [`DmsConfig::derive`].

use crate::DmsError;
use data_validator::{NormalizerConfig, ValidationConfig};
use feature_engine::TickRate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Eye state machine thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    /// Openness probability below which a tick counts as closed
    pub close_threshold: f64,
    /// Consecutive ticks required to change the debounced state
    pub debounce_frames: usize,
    /// Shortest closure run classified as a blink (frames, inclusive)
    pub blink_min_frames: usize,
    /// Longest closure run classified as a blink (frames, inclusive)
    pub blink_max_frames: usize,
    /// Closure length that marks a prolonged closure.
    ///
    /// Historically labelled a 2.5 s threshold, but the value in use is 0.8 s.
    pub prolonged_closure_s: f64,
    /// Minimum spacing between prolonged-closure episode starts
    pub prolonged_lockout_s: f64,
    pub perclos_window_s: f64,
    pub blink_rate_window_s: f64,
    pub max_close_run_window_s: f64,
    /// Short-term openness EMA time constant
    pub ema_short_tau_s: f64,
    /// Medium-term openness EMA time constant
    pub ema_long_tau_s: f64,
    /// Cap for time-since-last-blink
    pub time_since_cap_s: f64,
    /// Ticks a blink pulse stays raised
    pub pulse_frames: usize,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            close_threshold: 0.40,
            debounce_frames: 2,
            blink_min_frames: 2,
            blink_max_frames: 6,
            prolonged_closure_s: 0.8,
            prolonged_lockout_s: 2.0,
            perclos_window_s: 30.0,
            blink_rate_window_s: 30.0,
            max_close_run_window_s: 10.0,
            ema_short_tau_s: 1.0,
            ema_long_tau_s: 5.0,
            time_since_cap_s: 30.0,
            pulse_frames: 1,
        }
    }
}

/// Mouth state machine thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthConfig {
    /// Yawn probability EMA time constant
    pub ema_tau_s: f64,
    /// EMA level at or above which the mouth opens
    pub open_threshold: f64,
    /// EMA level at or below which the mouth closes
    pub close_threshold: f64,
    /// Opening duration that counts as a yawn
    pub yawn_min_duration_s: f64,
    /// Short-opening duration band (inclusive)
    pub short_opening_min_s: f64,
    pub short_opening_max_s: f64,
    pub opening_rate_window_s: f64,
    /// Cap for time-since-last-yawn
    pub time_since_cap_s: f64,
    /// Ticks a yawn pulse stays raised
    pub pulse_frames: usize,
}

impl Default for MouthConfig {
    fn default() -> Self {
        Self {
            ema_tau_s: 1.0,
            open_threshold: 0.55,
            close_threshold: 0.45,
            yawn_min_duration_s: 1.3,
            short_opening_min_s: 0.10,
            short_opening_max_s: 0.50,
            opening_rate_window_s: 30.0,
            time_since_cap_s: 30.0,
            pulse_frames: 1,
        }
    }
}

/// Head-nod rule thresholds (baseline-relative degrees; negative pitch is head down)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodConfig {
    /// Pitch at or below which a nod can start
    pub set_pitch_deg: f64,
    /// Pitch at or above which an active nod ends
    pub release_pitch_deg: f64,
    pub max_roll_deg: f64,
    pub max_yaw_deg: f64,
}

impl Default for NodConfig {
    fn default() -> Self {
        Self {
            set_pitch_deg: -4.0,
            release_pitch_deg: -2.0,
            max_roll_deg: 20.0,
            max_yaw_deg: 10.0,
        }
    }
}

/// Temporal window and classifier output hysteresis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Feature vectors fed to the classifier
    pub window_len: usize,
    /// Probability at or above which the state becomes drowsy
    pub drowsy_on_threshold: f64,
    /// Probability at or below which the state reverts to awake
    pub drowsy_off_threshold: f64,
    /// ONNX model; the heuristic mock is used when absent
    pub model_path: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_len: 90,
            drowsy_on_threshold: 0.65,
            drowsy_off_threshold: 0.55,
            model_path: None,
        }
    }
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Nominal tick rate (Hz)
    pub fps: f64,
    pub eye: EyeConfig,
    pub mouth: MouthConfig,
    pub nod: NodConfig,
    pub classifier: ClassifierConfig,
    /// Collect a z-score baseline at session start
    pub normalization_enabled: bool,
    pub normalization: NormalizerConfig,
    pub validation: ValidationConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            fps: 15.0,
            eye: EyeConfig::default(),
            mouth: MouthConfig::default(),
            nod: NodConfig::default(),
            classifier: ClassifierConfig::default(),
            normalization_enabled: true,
            normalization: NormalizerConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Frame counts derived from the tick rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedFrames {
    pub prolonged_eye_frames: usize,
    pub prolonged_lockout_frames: usize,
    pub perclos_capacity: usize,
    pub eye_run_capacity: usize,
    pub mouth_run_capacity: usize,
}

impl DmsConfig {
    /// Create strict config (earlier drowsy state, more sensitive eye threshold)
    pub fn strict() -> Self {
        let mut config = Self::default();
        config.eye.close_threshold = 0.45;
        config.classifier.drowsy_on_threshold = 0.55;
        config.classifier.drowsy_off_threshold = 0.45;
        config
    }

    /// Create lenient config (later drowsy state, less sensitive eye threshold)
    pub fn lenient() -> Self {
        let mut config = Self::default();
        config.eye.close_threshold = 0.35;
        config.classifier.drowsy_on_threshold = 0.75;
        config.classifier.drowsy_off_threshold = 0.65;
        config
    }

    /// Layered load: defaults, then an optional file, then `DMS__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, DmsError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config: DmsConfig = builder
            .add_source(
                ::config::Environment::with_prefix("DMS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DmsError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Whether the heuristic mock would score a z-scored window.
    /// Its cutoffs assume raw-scale features.
    pub fn heuristic_on_normalized_window(&self) -> bool {
        self.classifier.model_path.is_none() && self.normalization_enabled
    }

    pub fn tick_rate(&self) -> Result<TickRate, DmsError> {
        TickRate::new(self.fps).map_err(|e| DmsError::Config(e.to_string()))
    }

    /// Reject settings the state machines cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        self.tick_rate()?;

        let fail = |msg: &str| Err(DmsError::Config(msg.to_string()));
        if self.eye.debounce_frames == 0 {
            return fail("eye.debounce_frames must be > 0");
        }
        if self.eye.blink_min_frames > self.eye.blink_max_frames {
            return fail("eye.blink_min_frames must not exceed eye.blink_max_frames");
        }
        if self.eye.ema_short_tau_s <= 0.0 || self.eye.ema_long_tau_s <= 0.0 || self.mouth.ema_tau_s <= 0.0 {
            return fail("EMA time constants must be > 0");
        }
        if self.mouth.open_threshold <= self.mouth.close_threshold {
            return fail("mouth.open_threshold must be above mouth.close_threshold");
        }
        if self.classifier.drowsy_on_threshold <= self.classifier.drowsy_off_threshold {
            return fail("classifier.drowsy_on_threshold must be above drowsy_off_threshold");
        }
        if self.classifier.window_len == 0 {
            return fail("classifier.window_len must be > 0");
        }
        if self.nod.release_pitch_deg < self.nod.set_pitch_deg {
            return fail("nod.release_pitch_deg must not be below nod.set_pitch_deg");
        }
        if self.eye.perclos_window_s <= 0.0 {
            return fail("eye.perclos_window_s must be > 0");
        }
        Ok(())
    }

    /// Derive frame counts from the tick rate
    pub fn derive(&self) -> Result<DerivedFrames, DmsError> {
        let rate = self.tick_rate()?;
        let eye_horizon = self.eye.blink_rate_window_s.max(self.eye.max_close_run_window_s);

        Ok(DerivedFrames {
            prolonged_eye_frames: rate.frames_for(self.eye.prolonged_closure_s).max(1),
            prolonged_lockout_frames: rate.frames_for(self.eye.prolonged_lockout_s),
            perclos_capacity: rate.frames_for(self.eye.perclos_window_s).max(1),
            // A completed run spans at least one closed and one open tick
            eye_run_capacity: rate.frames_for(eye_horizon) / 2 + 1,
            mouth_run_capacity: rate.frames_for(self.mouth.opening_rate_window_s) / 2 + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derivation() {
        let derived = DmsConfig::default().derive().unwrap();
        assert_eq!(derived.prolonged_eye_frames, 12);
        assert_eq!(derived.prolonged_lockout_frames, 30);
        assert_eq!(derived.perclos_capacity, 450);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::default().validate().is_ok());
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_heuristic_on_normalized_window() {
        let mut config = DmsConfig::default();
        assert!(config.heuristic_on_normalized_window());

        config.normalization_enabled = false;
        assert!(!config.heuristic_on_normalized_window());

        config.normalization_enabled = true;
        config.classifier.model_path = Some("drowsiness.onnx".into());
        assert!(!config.heuristic_on_normalized_window());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut config = DmsConfig::default();
        config.mouth.open_threshold = 0.4;
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));

        let mut config = DmsConfig::default();
        config.fps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_defaults_without_file() {
        let config = DmsConfig::load(None).unwrap();
        assert_eq!(config.classifier.window_len, 90);
        assert_eq!(config.eye.close_threshold, 0.40);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("dms-config-{}.toml", std::process::id()));
        std::fs::write(&path, "fps = 30.0\n\n[mouth]\nopen_threshold = 0.6\n").unwrap();

        let config = DmsConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.fps, 30.0);
        assert_eq!(config.mouth.open_threshold, 0.6);
        // Untouched fields keep defaults
        assert_eq!(config.mouth.close_threshold, 0.45);
        assert_eq!(config.derive().unwrap().prolonged_eye_frames, 24);
    }
}
