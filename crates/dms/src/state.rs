//! Driver alertness state

use serde::{Deserialize, Serialize};
use tracing::info;

/// Final smoothed driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertnessState {
    #[default]
    Awake,
    Drowsy,
}

/// Two-threshold latch over the classifier probability
#[derive(Debug, Clone)]
pub struct DrowsinessHysteresis {
    on_threshold: f64,
    off_threshold: f64,
    state: AlertnessState,
}

impl DrowsinessHysteresis {
    pub fn new(on_threshold: f64, off_threshold: f64) -> Self {
        Self {
            on_threshold,
            off_threshold,
            state: AlertnessState::Awake,
        }
    }

    /// Feed one probability and return the resulting state
    pub fn update(&mut self, probability: f64) -> AlertnessState {
        let next = match self.state {
            AlertnessState::Awake if probability >= self.on_threshold => AlertnessState::Drowsy,
            AlertnessState::Drowsy if probability <= self.off_threshold => AlertnessState::Awake,
            current => current,
        };
        if next != self.state {
            info!("Driver state {:?} -> {:?} (p={:.3})", self.state, next, probability);
            self.state = next;
        }
        self.state
    }

    pub fn state(&self) -> AlertnessState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AlertnessState::{Awake, Drowsy};

    #[test]
    fn test_latch_sequence() {
        let mut h = DrowsinessHysteresis::new(0.65, 0.55);
        let states: Vec<_> = [0.70, 0.60, 0.50, 0.60, 0.70]
            .into_iter()
            .map(|p| h.update(p))
            .collect();
        assert_eq!(states, vec![Drowsy, Drowsy, Awake, Awake, Drowsy]);
    }

    #[test]
    fn test_thresholds_inclusive() {
        let mut h = DrowsinessHysteresis::new(0.65, 0.55);
        assert_eq!(h.update(0.65), Drowsy);
        assert_eq!(h.update(0.55), Awake);
        assert_eq!(h.state(), Awake);
    }
}
