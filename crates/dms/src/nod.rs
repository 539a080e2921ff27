//! Head-nod detection
//!
//! A nod is a prolonged eye closure with the head dropped forward while
//! roughly facing the road.

use crate::config::NodConfig;
use feature_engine::PoseSample;
use tracing::info;

#[derive(Debug, Clone)]
pub struct NodDetector {
    config: NodConfig,
    active: bool,
}

impl NodDetector {
    pub fn new(config: NodConfig) -> Self {
        Self {
            config,
            active: false,
        }
    }

    /// Update with the debounced eye state and the baseline-relative pose
    pub fn update(&mut self, eye_closed: bool, eye_prolonged: bool, pose: &PoseSample) -> bool {
        let c = &self.config;
        if self.active {
            if !eye_closed || pose.yaw.abs() > c.max_yaw_deg || pose.pitch >= c.release_pitch_deg {
                self.active = false;
                info!("Head nod released (pitch {:.1})", pose.pitch);
            }
        } else if eye_prolonged
            && pose.pitch <= c.set_pitch_deg
            && pose.roll.abs() <= c.max_roll_deg
            && pose.yaw.abs() <= c.max_yaw_deg
        {
            self.active = true;
            info!("Head nod set (pitch {:.1})", pose.pitch);
        }
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
