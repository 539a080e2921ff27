//! DMS analysis results and alerts

use crate::eye::EyeOutput;
use crate::mouth::MouthOutput;
use crate::state::AlertnessState;
use crate::window::WindowStatus;
use data_validator::NormalizationStatus;
use feature_engine::{FeatureVector, PoseSample};
use serde::{Deserialize, Serialize};

/// DMS alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmsAlert {
    /// Classifier latched the drowsy state
    Drowsiness,

    /// Prolonged closure with the head dropped forward
    HeadNod,

    /// Eyes closed past the prolonged-closure threshold
    ProlongedEyeClosure,

    /// Yawn completed this tick
    Yawn,
}

/// Discrete per-tick states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteStates {
    pub eye_closed: bool,
    pub blink_pulse: bool,
    pub prolonged_eye: bool,
    pub mouth_open: bool,
    pub yawn_pulse: bool,
    pub yawn_prolonged: bool,
    pub nod_active: bool,
}

/// Complete DMS analysis result for one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmsAnalysis {
    pub frame: u64,
    pub timestamp_s: f64,

    /// Vector pushed into the temporal window
    pub features: FeatureVector,

    /// Same vector before baseline normalization
    pub raw_features: FeatureVector,

    /// Baseline-relative, smoothed head pose
    pub pose: PoseSample,

    pub eye: EyeOutput,
    pub mouth: MouthOutput,
    pub states: DiscreteStates,

    pub normalization: NormalizationStatus,
    pub window: WindowStatus,

    /// Hysteresis-smoothed driver state
    pub alertness: AlertnessState,

    /// Classifier output for this tick (absent while the window warms up)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drowsiness_probability: Option<f64>,

    /// Classifier failure for this tick; the previous state is held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_error: Option<String>,

    /// Probe fields repaired by validation this tick
    pub input_repairs: usize,

    /// Active alerts
    pub alerts: Vec<DmsAlert>,
}

impl DmsAnalysis {
    /// Check if any alerts are active
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Get highest severity alert
    pub fn highest_severity_alert(&self) -> Option<DmsAlert> {
        // Priority: Drowsiness > HeadNod > ProlongedEyeClosure > Yawn
        [
            DmsAlert::Drowsiness,
            DmsAlert::HeadNod,
            DmsAlert::ProlongedEyeClosure,
            DmsAlert::Yawn,
        ]
        .into_iter()
        .find(|alert| self.alerts.contains(alert))
    }

    pub fn is_drowsy(&self) -> bool {
        self.alertness == AlertnessState::Drowsy
    }
}

pub(crate) fn collect_alerts(states: &DiscreteStates, alertness: AlertnessState) -> Vec<DmsAlert> {
    let mut alerts = Vec::new();
    if alertness == AlertnessState::Drowsy {
        alerts.push(DmsAlert::Drowsiness);
    }
    if states.nod_active {
        alerts.push(DmsAlert::HeadNod);
    }
    if states.prolonged_eye {
        alerts.push(DmsAlert::ProlongedEyeClosure);
    }
    if states.yawn_pulse {
        alerts.push(DmsAlert::Yawn);
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_priority() {
        let states = DiscreteStates {
            prolonged_eye: true,
            yawn_pulse: true,
            ..Default::default()
        };
        let alerts = collect_alerts(&states, AlertnessState::Awake);
        assert_eq!(alerts, vec![DmsAlert::ProlongedEyeClosure, DmsAlert::Yawn]);

        let alerts = collect_alerts(
            &DiscreteStates {
                nod_active: true,
                ..states
            },
            AlertnessState::Drowsy,
        );
        assert_eq!(alerts.first(), Some(&DmsAlert::Drowsiness));
        assert!(alerts.contains(&DmsAlert::HeadNod));
    }
}
