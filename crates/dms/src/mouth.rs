//! Mouth state machine
//!
//! Smooths the yawn probability and applies an open/close hysteresis band.
//! Openings that last long enough are yawns; short openings feed a rate
//! statistic.

use crate::config::{DerivedFrames, MouthConfig};
use crate::runs::{Run, RunLog};
use feature_engine::{Ema, Tick, TickRate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Mouth signals for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MouthOutput {
    pub yawn_ema: f64,
    pub open: bool,
    /// A yawn completed on this tick
    pub yawn_detected: bool,
    pub yawn_pulse: bool,
    /// Current opening has lasted at least the yawn duration
    pub prolonged: bool,
    /// Duration of the current opening (0 while closed)
    pub open_duration_s: f64,
    /// Short openings per second
    pub opening_rate_30s: f64,
    pub time_since_last_yawn_s: f64,
}

#[derive(Debug, Clone)]
pub struct MouthStateMachine {
    config: MouthConfig,
    rate: TickRate,
    ema: Ema,
    open: bool,
    open_frames: usize,
    prolonged: bool,
    pulse_remaining: usize,
    last_yawn_s: Option<f64>,
    runs: RunLog,
}

impl MouthStateMachine {
    pub fn new(config: MouthConfig, rate: TickRate, derived: &DerivedFrames) -> Self {
        Self {
            rate,
            ema: Ema::from_time_constant(config.ema_tau_s, rate.dt()),
            open: false,
            open_frames: 0,
            prolonged: false,
            pulse_remaining: 0,
            last_yawn_s: None,
            runs: RunLog::new(derived.mouth_run_capacity, config.opening_rate_window_s),
            config,
        }
    }

    /// Advance by one tick with a finite yawn probability.
    ///
    /// An unobserved (substituted) probability holds the EMA; before the first
    /// observation the substitute is reported without seeding it.
    pub fn update(&mut self, tick: Tick, yawn_probability: f64, observed: bool) -> MouthOutput {
        let now = tick.timestamp_s;
        self.pulse_remaining = self.pulse_remaining.saturating_sub(1);
        let level = self
            .ema
            .update_or_hold(observed.then_some(yawn_probability), yawn_probability);

        let mut yawn_detected = false;
        if !self.open {
            if level >= self.config.open_threshold {
                self.open = true;
                self.open_frames = 1;
                debug!("Mouth opened at frame {} (ema {:.3})", tick.frame, level);
            }
        } else if level <= self.config.close_threshold {
            yawn_detected = self.finish_run(now);
        } else {
            self.open_frames += 1;
        }

        let open_duration_s = if self.open {
            self.rate.seconds_for(self.open_frames)
        } else {
            0.0
        };
        if self.open && !self.prolonged && open_duration_s >= self.config.yawn_min_duration_s {
            self.prolonged = true;
            debug!("Mouth opening prolonged at frame {}", tick.frame);
        }

        self.runs.prune(now);
        let short_openings = self
            .runs
            .recent(now, self.config.opening_rate_window_s)
            .filter(|run| self.is_short_opening(run))
            .count();

        MouthOutput {
            yawn_ema: level,
            open: self.open,
            yawn_detected,
            yawn_pulse: self.pulse_remaining > 0,
            prolonged: self.prolonged,
            open_duration_s,
            opening_rate_30s: short_openings as f64 / self.config.opening_rate_window_s,
            time_since_last_yawn_s: self.time_since_last_yawn(now),
        }
    }

    fn finish_run(&mut self, now: f64) -> bool {
        let run = Run {
            end_time_s: now,
            length_frames: self.open_frames,
            duration_s: self.rate.seconds_for(self.open_frames),
        };
        self.open = false;
        self.open_frames = 0;
        self.prolonged = false;
        self.runs.record(run);

        let yawn = run.duration_s >= self.config.yawn_min_duration_s;
        if yawn {
            self.last_yawn_s = Some(now);
            self.pulse_remaining = self.config.pulse_frames;
            info!("Yawn detected: {:.2}s opening", run.duration_s);
        }
        yawn
    }

    fn is_short_opening(&self, run: &Run) -> bool {
        const EPS: f64 = 1e-9;
        run.duration_s >= self.config.short_opening_min_s - EPS
            && run.duration_s <= self.config.short_opening_max_s + EPS
    }

    fn time_since_last_yawn(&self, now: f64) -> f64 {
        let cap = self.config.time_since_cap_s;
        self.last_yawn_s
            .map_or(cap, |t| (now - t).clamp(0.0, cap))
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn runs(&self) -> &RunLog {
        &self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DmsConfig;

    fn machine() -> MouthStateMachine {
        let config = DmsConfig::default();
        let derived = config.derive().unwrap();
        MouthStateMachine::new(config.mouth, TickRate::default(), &derived)
    }

    fn feed(mouth: &mut MouthStateMachine, start: &mut u64, values: &[f64]) -> Vec<MouthOutput> {
        values
            .iter()
            .map(|&p| {
                let tick = Tick {
                    frame: *start,
                    timestamp_s: *start as f64 / 15.0,
                };
                *start += 1;
                mouth.update(tick, p, true)
            })
            .collect()
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let mut mouth = machine();
        let mut frame = 0;
        let chatter: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 0.46 } else { 0.54 }).collect();
        let outputs = feed(&mut mouth, &mut frame, &chatter);
        assert!(outputs.iter().all(|o| !o.open));

        // Opened first, the same chatter keeps it open
        let mut mouth = machine();
        let mut frame = 0;
        feed(&mut mouth, &mut frame, &[0.6]);
        let outputs = feed(&mut mouth, &mut frame, &chatter);
        assert!(outputs.iter().all(|o| o.open));
    }

    #[test]
    fn test_short_opening_counts_toward_rate() {
        let mut mouth = machine();
        let mut frame = 0;
        // EMA initializes just above the open threshold and falls below 0.45 on the 4th tick
        let mut values = vec![0.56];
        values.extend([0.0; 11]);
        let outputs = feed(&mut mouth, &mut frame, &values);
        assert!(outputs[0].open);
        let closed_at = outputs.iter().position(|o| !o.open).unwrap();
        assert_eq!(closed_at, 4);
        assert!(!outputs[closed_at].yawn_detected);

        let run = *mouth.runs().last().unwrap();
        assert!(run.duration_s >= 0.1 && run.duration_s <= 0.5, "{run:?}");
        assert!((outputs.last().unwrap().opening_rate_30s - 1.0 / 30.0).abs() < 1e-9);
        assert_eq!(outputs.last().unwrap().time_since_last_yawn_s, 30.0);
    }

    #[test]
    fn test_yawn_is_one_pulse() {
        let mut mouth = machine();
        let mut frame = 0;
        feed(&mut mouth, &mut frame, &[0.6; 30]);
        let outputs = feed(&mut mouth, &mut frame, &[0.1; 60]);

        assert_eq!(outputs.iter().filter(|o| o.yawn_pulse).count(), 1);
        let pulse = outputs.iter().position(|o| o.yawn_pulse).unwrap();
        assert!(outputs[pulse].yawn_detected);
        assert!(!outputs[pulse].open);
        assert!(outputs[pulse - 1].open);
        assert!(outputs[pulse - 1].prolonged);
        assert!(!outputs[pulse].prolonged);
        assert_eq!(outputs[pulse].time_since_last_yawn_s, 0.0);
    }

    #[test]
    fn test_time_since_yawn_saturates_at_cap() {
        let mut mouth = machine();
        let mut frame = 0;
        feed(&mut mouth, &mut frame, &[0.6; 30]);
        let outputs = feed(&mut mouth, &mut frame, &[0.1; 520]);

        let pulse = outputs.iter().position(|o| o.yawn_pulse).unwrap();
        let after = &outputs[pulse..];
        for pair in after.windows(2) {
            assert!(pair[1].time_since_last_yawn_s >= pair[0].time_since_last_yawn_s);
        }
        let capped_at = after
            .iter()
            .position(|o| o.time_since_last_yawn_s == 30.0)
            .unwrap();
        assert!((449..=452).contains(&capped_at), "{capped_at}");
        assert!(after[capped_at..].iter().all(|o| o.time_since_last_yawn_s == 30.0));
    }

    #[test]
    fn test_missing_probability_holds_ema() {
        let mut mouth = machine();
        let tick = |frame: u64| Tick {
            frame,
            timestamp_s: frame as f64 / 15.0,
        };
        assert_eq!(mouth.update(tick(0), 0.0, false).yawn_ema, 0.0);
        assert_eq!(mouth.update(tick(1), 0.6, true).yawn_ema, 0.6);
        let held = mouth.update(tick(2), 0.0, false);
        assert_eq!(held.yawn_ema, 0.6);
        assert!(held.open);
    }
}
