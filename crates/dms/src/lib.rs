//! Driver Monitoring System (DMS)
//!
//! Per-tick driver drowsiness analysis from head pose, eye-openness and
//! yawn probabilities:
//! - baseline-relative head pose with smoothed angular rates
//! - debounced eye state, blink and prolonged-closure detection
//! - mouth hysteresis and yawn detection
//! - head-nod detection
//! - 20-feature vector, session baseline normalization, 90-tick window
//! - temporal classifier with a drowsy/awake hysteresis latch

pub mod analysis;
pub mod config;
pub mod eye;
pub mod mouth;
pub mod nod;
pub mod runs;
pub mod state;
pub mod window;

pub use analysis::{DiscreteStates, DmsAlert, DmsAnalysis};
pub use config::{ClassifierConfig, DerivedFrames, DmsConfig, EyeConfig, MouthConfig, NodConfig};
pub use eye::{EyeOutput, EyeStateMachine};
pub use mouth::{MouthOutput, MouthStateMachine};
pub use nod::NodDetector;
pub use runs::{Run, RunLog};
pub use state::{AlertnessState, DrowsinessHysteresis};
pub use window::{TemporalWindow, WindowStatus};

pub use data_validator::{NormalizationStatus, RawFrame};
pub use inference_engine::{InferenceEngine, InferenceError, TemporalClassifier};

use data_validator::{BaselineNormalizer, ValidationError, Validator};
use feature_engine::{
    BaselineCalibrator, Clock, FeatureAssembler, FeatureError, FeatureInputs, FeatureVector,
    PoseSmoother, FEATURE_DIMENSION,
};
use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Classifier expects {actual:?} (timesteps, features), pipeline produces {expected:?}")]
    SchemaMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Rejected tick: {0}")]
    Tick(#[from] FeatureError),

    #[error("Model loading failed: {0}")]
    ModelLoad(#[from] InferenceError),

    #[error("Normalization failed: {0}")]
    Normalization(#[from] ValidationError),
}

/// Per-session pipeline state
struct Pipeline {
    clock: Clock,
    calibrator: BaselineCalibrator,
    pose: PoseSmoother,
    eye: EyeStateMachine,
    mouth: MouthStateMachine,
    nod: NodDetector,
    assembler: FeatureAssembler,
    normalizer: BaselineNormalizer,
    window: TemporalWindow,
    hysteresis: DrowsinessHysteresis,
    /// Ticks with at least one repaired probe field
    repaired_ticks: u64,
}

impl Pipeline {
    fn new(config: &DmsConfig, normalization_enabled: bool) -> Result<Self, DmsError> {
        let rate = config.tick_rate()?;
        let derived = config.derive()?;
        Ok(Self {
            clock: Clock::new(rate),
            calibrator: BaselineCalibrator::new(),
            pose: PoseSmoother::new(rate.dt()),
            eye: EyeStateMachine::new(config.eye.clone(), rate, &derived),
            mouth: MouthStateMachine::new(config.mouth.clone(), rate, &derived),
            nod: NodDetector::new(config.nod.clone()),
            assembler: FeatureAssembler::new(),
            normalizer: BaselineNormalizer::new(
                config.normalization.clone(),
                FEATURE_DIMENSION,
                normalization_enabled,
            ),
            window: TemporalWindow::new(config.classifier.window_len),
            hysteresis: DrowsinessHysteresis::new(
                config.classifier.drowsy_on_threshold,
                config.classifier.drowsy_off_threshold,
            ),
            repaired_ticks: 0,
        })
    }
}

/// Driver monitoring session
pub struct DmsSession {
    config: DmsConfig,
    validator: Validator,
    engine: InferenceEngine,
    /// Applied at the next session start
    normalization_enabled: bool,
    pipeline: Pipeline,
}

impl DmsSession {
    /// Create a session around an inference engine.
    ///
    /// Fails when the engine's input shape does not match the window length
    /// and feature dimension.
    pub fn new(config: DmsConfig, engine: InferenceEngine) -> Result<Self, DmsError> {
        config.validate()?;

        let expected = (config.classifier.window_len, FEATURE_DIMENSION);
        let actual = engine.input_shape();
        if actual != expected {
            return Err(DmsError::SchemaMismatch { expected, actual });
        }

        let normalization_enabled = config.normalization_enabled;
        Ok(Self {
            validator: Validator::new(config.validation.clone()),
            pipeline: Pipeline::new(&config, normalization_enabled)?,
            engine,
            normalization_enabled,
            config,
        })
    }

    /// Create a session with the configured model, or the heuristic mock when none is set
    pub fn from_config(config: DmsConfig) -> Result<Self, DmsError> {
        if config.heuristic_on_normalized_window() {
            warn!("No classifier model set: heuristic scores will be miscalibrated on normalized features");
        }
        let engine = InferenceEngine::new(
            config.classifier.model_path.as_deref(),
            config.classifier.window_len,
        )?;
        Self::new(config, engine)
    }

    /// Process one tick of probe outputs.
    ///
    /// A tick whose timestamp does not advance is rejected and leaves all
    /// state untouched.
    pub fn process_tick(&mut self, raw: &RawFrame, timestamp_s: f64) -> Result<DmsAnalysis, DmsError> {
        let p = &mut self.pipeline;
        let tick = p.clock.advance(timestamp_s)?;

        let validation = self.validator.sanitize(raw);
        if !validation.is_clean() {
            p.repaired_ticks += 1;
            if p.repaired_ticks == 1 {
                warn!(
                    "Frame {}: substituting defaults for invalid probe input: {:?}",
                    tick.frame, validation.errors
                );
            } else {
                debug!("Frame {}: repaired {:?}", tick.frame, validation.errors);
            }
        }
        let frame = validation.frame;

        // Without a valid pose the neutral baseline-relative posture is used
        let (yaw, pitch, roll) = if frame.pose_valid {
            p.calibrator.observe(frame.yaw_deg, frame.pitch_deg, frame.roll_deg)
        } else {
            (0.0, 0.0, 0.0)
        };
        let pose = p.pose.update(yaw, pitch, roll);

        let eye = p.eye.update(tick, frame.eye_openness, frame.eye_observed);
        let mouth = p.mouth.update(tick, frame.yawn_probability, frame.yawn_observed);
        let nod_active = p.nod.update(eye.closed, eye.prolonged, &pose);

        let raw_features = p.assembler.assemble(&FeatureInputs {
            pose,
            eye_openness: eye.openness,
            eye_ema_short: eye.ema_short,
            eye_ema_long: eye.ema_long,
            eye_trend: eye.trend,
            eye_closure_duration_s: eye.closure_duration_s,
            eye_closed_run_frames: eye.closed_run_frames as f64,
            perclos_30s: eye.perclos_30s,
            blink_rate_30s: eye.blink_rate_30s,
            max_close_run_10s: eye.max_close_run_10s,
            time_since_last_blink_s: eye.time_since_last_blink_s,
            yawn_ema: mouth.yawn_ema,
            mouth_open_duration_s: mouth.open_duration_s,
            mouth_open_rate_30s: mouth.opening_rate_30s,
            time_since_last_yawn_s: mouth.time_since_last_yawn_s,
        });

        if p.normalizer.is_collecting() {
            p.normalizer.absorb(raw_features.as_slice(), tick.timestamp_s)?;
        }
        let features = to_vector(&p.normalizer.normalize(raw_features.as_slice())?);
        p.window.push(features);

        let mut drowsiness_probability = None;
        let mut classifier_error = None;
        if p.window.is_ready() {
            match self.engine.predict(p.window.to_array().view()) {
                Ok(result) => {
                    p.hysteresis.update(result.probability);
                    drowsiness_probability = Some(result.probability);
                }
                Err(e) => {
                    warn!("Classifier failed at frame {}: {}", tick.frame, e);
                    classifier_error = Some(e.to_string());
                }
            }
        }
        let alertness = p.hysteresis.state();

        let states = DiscreteStates {
            eye_closed: eye.closed,
            blink_pulse: eye.blink_pulse,
            prolonged_eye: eye.prolonged,
            mouth_open: mouth.open,
            yawn_pulse: mouth.yawn_pulse,
            yawn_prolonged: mouth.prolonged,
            nod_active,
        };

        Ok(DmsAnalysis {
            frame: tick.frame,
            timestamp_s: tick.timestamp_s,
            features,
            raw_features,
            pose,
            eye,
            mouth,
            states,
            normalization: p.normalizer.status(),
            window: p.window.status(),
            alertness,
            drowsiness_probability,
            classifier_error,
            input_repairs: validation.errors.len(),
            alerts: analysis::collect_alerts(&states, alertness),
        })
    }

    /// Enable or disable baseline normalization from the next session start
    pub fn set_normalization_enabled(&mut self, enabled: bool) {
        debug!("Normalization {} from next session", if enabled { "enabled" } else { "disabled" });
        self.normalization_enabled = enabled;
    }

    /// Discard all per-session state (driver change, trip restart)
    pub fn reset_session(&mut self) -> Result<(), DmsError> {
        self.pipeline = Pipeline::new(&self.config, self.normalization_enabled)?;
        debug!("Session reset");
        Ok(())
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn normalization_status(&self) -> NormalizationStatus {
        self.pipeline.normalizer.status()
    }

    pub fn alertness(&self) -> AlertnessState {
        self.pipeline.hysteresis.state()
    }

    /// Whether the session's baseline orientation has been captured
    pub fn is_calibrated(&self) -> bool {
        self.pipeline.calibrator.is_captured()
    }

    /// Ticks this session that needed at least one input repair
    pub fn repaired_ticks(&self) -> u64 {
        self.pipeline.repaired_ticks
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }
}

fn to_vector(values: &[f64]) -> FeatureVector {
    let mut vector = FeatureVector::default();
    for (slot, value) in vector.values.iter_mut().zip(values) {
        *slot = *value;
    }
    vector
}
