//! Eye state machine
//!
//! Debounces the raw closed/open classification, records completed closure
//! runs, classifies blinks by run length and detects prolonged closures.
//! Rolling statistics (PERCLOS, blink rate, longest recent closure) are
//! maintained alongside.

use crate::config::{DerivedFrames, EyeConfig};
use crate::runs::{Run, RunLog};
use feature_engine::{Ema, Tick, TickRate};
use ring_buffer::RollingAverage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Eye signals for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeOutput {
    /// Openness probability as fed in
    pub openness: f64,
    /// Undebounced classification
    pub raw_closed: bool,
    /// Debounced classification
    pub closed: bool,
    /// A blink was classified on this tick
    pub blink_detected: bool,
    pub blink_pulse: bool,
    pub prolonged: bool,
    /// Frames in the current debounced closure (0 while open)
    pub closed_run_frames: usize,
    /// Duration of the current debounced closure (0 while open)
    pub closure_duration_s: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    /// Short EMA minus long EMA
    pub trend: f64,
    pub perclos_30s: f64,
    /// Blinks per second
    pub blink_rate_30s: f64,
    pub max_close_run_10s: f64,
    pub time_since_last_blink_s: f64,
}

/// Debounced eye closure tracking
#[derive(Debug, Clone)]
pub struct EyeStateMachine {
    config: EyeConfig,
    rate: TickRate,
    prolonged_frames: usize,
    lockout_frames: u64,

    closed: bool,
    on_count: usize,
    off_count: usize,
    run_frames: usize,

    prolonged: bool,
    last_prolonged_start: Option<u64>,
    pulse_remaining: usize,
    last_blink_s: Option<f64>,

    runs: RunLog,
    perclos: RollingAverage,
    ema_short: Ema,
    ema_long: Ema,
}

impl EyeStateMachine {
    pub fn new(config: EyeConfig, rate: TickRate, derived: &DerivedFrames) -> Self {
        let horizon_s = config.blink_rate_window_s.max(config.max_close_run_window_s);
        Self {
            rate,
            prolonged_frames: derived.prolonged_eye_frames,
            lockout_frames: derived.prolonged_lockout_frames as u64,
            closed: false,
            on_count: 0,
            off_count: 0,
            run_frames: 0,
            prolonged: false,
            last_prolonged_start: None,
            pulse_remaining: 0,
            last_blink_s: None,
            runs: RunLog::new(derived.eye_run_capacity, horizon_s),
            perclos: RollingAverage::new(derived.perclos_capacity),
            ema_short: Ema::from_time_constant(config.ema_short_tau_s, rate.dt()),
            ema_long: Ema::from_time_constant(config.ema_long_tau_s, rate.dt()),
            config,
        }
    }

    /// Advance by one tick with a finite openness probability.
    ///
    /// When `observed` is false the value is a substituted default: it drives
    /// the closed/open classification but is kept out of the EMAs.
    pub fn update(&mut self, tick: Tick, openness: f64, observed: bool) -> EyeOutput {
        let now = tick.timestamp_s;
        self.pulse_remaining = self.pulse_remaining.saturating_sub(1);

        let raw_closed = openness < self.config.close_threshold;
        self.perclos.push_flag(raw_closed);
        let sample = observed.then_some(openness);
        let ema_short = self.ema_short.update_or_hold(sample, openness);
        let ema_long = self.ema_long.update_or_hold(sample, openness);

        if raw_closed {
            self.on_count += 1;
            self.off_count = 0;
        } else {
            self.off_count += 1;
            self.on_count = 0;
        }

        let mut blink_detected = false;
        if !self.closed {
            if self.on_count >= self.config.debounce_frames {
                self.closed = true;
                // The run includes the ticks spent debouncing
                self.run_frames = self.on_count;
                debug!("Eyes closed at frame {}", tick.frame);
            }
        } else if raw_closed {
            self.run_frames += 1;
        } else if self.off_count >= self.config.debounce_frames {
            blink_detected = self.finish_run(now);
        }

        if !self.closed {
            self.prolonged = false;
        } else if !self.prolonged && self.run_frames >= self.prolonged_frames {
            let unlocked = self
                .last_prolonged_start
                .map_or(true, |start| tick.frame.saturating_sub(start) >= self.lockout_frames);
            if unlocked {
                self.prolonged = true;
                self.last_prolonged_start = Some(tick.frame);
                info!(
                    "Prolonged eye closure: {} frames at frame {}",
                    self.run_frames, tick.frame
                );
            }
        }

        self.runs.prune(now);

        let blink_count = self
            .runs
            .recent(now, self.config.blink_rate_window_s)
            .filter(|run| self.is_blink(run))
            .count();
        let max_close_run = self
            .runs
            .recent(now, self.config.max_close_run_window_s)
            .map(|run| run.duration_s)
            .fold(0.0, f64::max);

        let closed_run_frames = if self.closed { self.run_frames } else { 0 };

        EyeOutput {
            openness,
            raw_closed,
            closed: self.closed,
            blink_detected,
            blink_pulse: self.pulse_remaining > 0,
            prolonged: self.prolonged,
            closed_run_frames,
            closure_duration_s: self.rate.seconds_for(closed_run_frames),
            ema_short,
            ema_long,
            trend: ema_short - ema_long,
            perclos_30s: self.perclos.mean(),
            blink_rate_30s: blink_count as f64 / self.config.blink_rate_window_s,
            max_close_run_10s: max_close_run,
            time_since_last_blink_s: self.time_since_last_blink(now),
        }
    }

    /// Close out the current run on the closed-to-open transition.
    /// Returns whether it was a blink.
    fn finish_run(&mut self, now: f64) -> bool {
        let run = Run {
            end_time_s: now,
            length_frames: self.run_frames,
            duration_s: self.rate.seconds_for(self.run_frames),
        };
        self.closed = false;
        self.run_frames = 0;
        self.runs.record(run);

        let blink = self.is_blink(&run);
        if blink {
            self.last_blink_s = Some(now);
            self.pulse_remaining = self.config.pulse_frames;
        }
        debug!(
            "Eye run ended: {} frames ({:.2}s), blink={}",
            run.length_frames, run.duration_s, blink
        );
        blink
    }

    fn is_blink(&self, run: &Run) -> bool {
        (self.config.blink_min_frames..=self.config.blink_max_frames).contains(&run.length_frames)
    }

    fn time_since_last_blink(&self, now: f64) -> f64 {
        let cap = self.config.time_since_cap_s;
        self.last_blink_s
            .map_or(cap, |t| (now - t).clamp(0.0, cap))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_prolonged(&self) -> bool {
        self.prolonged
    }

    /// Completed runs still inside the statistics horizon
    pub fn runs(&self) -> &RunLog {
        &self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DmsConfig;

    struct Driver {
        eye: EyeStateMachine,
        frame: u64,
    }

    impl Driver {
        fn new() -> Self {
            let config = DmsConfig::default();
            let derived = config.derive().unwrap();
            Self {
                eye: EyeStateMachine::new(config.eye, TickRate::default(), &derived),
                frame: 0,
            }
        }

        fn step(&mut self, openness: f64) -> EyeOutput {
            let tick = Tick {
                frame: self.frame,
                timestamp_s: self.frame as f64 / 15.0,
            };
            self.frame += 1;
            self.eye.update(tick, openness, true)
        }

        fn run(&mut self, openness: f64, ticks: usize) -> Vec<EyeOutput> {
            (0..ticks).map(|_| self.step(openness)).collect()
        }
    }

    #[test]
    fn test_single_closed_tick_is_debounced() {
        let mut d = Driver::new();
        d.run(0.9, 5);
        let out = d.step(0.1);
        assert!(out.raw_closed);
        assert!(!out.closed);
        let after = d.run(0.9, 10);
        assert!(after.iter().all(|o| !o.closed && !o.blink_detected));
        assert!(d.eye.runs().is_empty());
    }

    #[test]
    fn test_blink_classification_by_length() {
        for (closed_ticks, is_blink) in [(2, true), (6, true), (7, false)] {
            let mut d = Driver::new();
            d.run(0.9, 5);
            d.run(0.1, closed_ticks);
            let outputs = d.run(0.9, 3);

            let blinks = outputs.iter().filter(|o| o.blink_detected).count();
            assert_eq!(blinks, usize::from(is_blink), "closed_ticks = {closed_ticks}");
            assert_eq!(d.eye.runs().last().unwrap().length_frames, closed_ticks);
        }
    }

    #[test]
    fn test_pulse_lasts_one_tick() {
        let mut d = Driver::new();
        d.run(0.9, 3);
        d.run(0.1, 3);
        let outputs = d.run(0.9, 4);

        // Open debounce completes on the second open tick
        assert!(!outputs[0].blink_pulse);
        assert!(outputs[1].blink_pulse);
        assert_eq!(outputs[1].time_since_last_blink_s, 0.0);
        assert!(!outputs[2].blink_pulse);
        assert!((outputs[3].time_since_last_blink_s - 2.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_since_blink_starts_at_cap() {
        let mut d = Driver::new();
        assert_eq!(d.step(0.9).time_since_last_blink_s, 30.0);
    }

    #[test]
    fn test_time_since_blink_saturates_at_cap() {
        let mut d = Driver::new();
        d.run(0.9, 3);
        d.run(0.1, 3);
        let outputs = d.run(0.9, 500);
        assert_eq!(outputs[1].time_since_last_blink_s, 0.0);

        for pair in outputs[1..].windows(2) {
            assert!(pair[1].time_since_last_blink_s >= pair[0].time_since_last_blink_s);
        }
        // 30 s after the blink tick
        let capped_at = outputs
            .iter()
            .position(|o| o.time_since_last_blink_s == 30.0)
            .unwrap();
        assert!((449..=452).contains(&capped_at), "{capped_at}");
        assert!(outputs[capped_at..].iter().all(|o| o.time_since_last_blink_s == 30.0));
    }

    #[test]
    fn test_substituted_openness_does_not_seed_emas() {
        let mut d = Driver::new();
        let tick = Tick {
            frame: 0,
            timestamp_s: 0.0,
        };
        let substituted = d.eye.update(tick, 0.5, false);
        assert_eq!(substituted.ema_short, 0.5);
        assert_eq!(substituted.trend, 0.0);

        d.frame = 1;
        let first = d.step(0.9);
        assert_eq!(first.ema_short, 0.9);
        assert_eq!(first.ema_long, 0.9);

        // A later gap holds the averages
        let tick = Tick {
            frame: 2,
            timestamp_s: 2.0 / 15.0,
        };
        let held = d.eye.update(tick, 0.5, false);
        assert_eq!(held.ema_short, 0.9);
        assert_eq!(held.ema_long, 0.9);
    }

    #[test]
    fn test_prolonged_closure_and_reset() {
        let mut d = Driver::new();
        let outputs = d.run(0.1, 20);

        let first = outputs.iter().position(|o| o.prolonged).unwrap();
        assert_eq!(outputs[first].closed_run_frames, 12);
        assert!(outputs[first..].iter().all(|o| o.prolonged));

        d.step(0.9);
        let out = d.step(0.9);
        assert!(!out.closed);
        assert!(!out.prolonged);
    }

    #[test]
    fn test_prolonged_lockout() {
        let mut d = Driver::new();
        // First episode starts at frame 11 (12th closed tick)
        d.run(0.1, 12);
        d.run(0.9, 2);
        // Second closure reaches 12 frames at frame 25, inside the 30-frame lockout
        let second = d.run(0.1, 30);
        assert!(!second[11].prolonged);
        let first_prolonged = second.iter().position(|o| o.prolonged).unwrap();
        assert_eq!(d.frame as usize - second.len() + first_prolonged, 41);
    }

    #[test]
    fn test_perclos_and_emas() {
        let mut d = Driver::new();
        let first = d.step(0.8);
        // EMAs initialize to the first sample
        assert_eq!(first.ema_short, 0.8);
        assert_eq!(first.ema_long, 0.8);
        assert_eq!(first.trend, 0.0);

        d.run(0.8, 9);
        let outputs = d.run(0.1, 10);
        let last = outputs.last().unwrap();
        assert!((last.perclos_30s - 0.5).abs() < 1e-9);
        assert!(last.trend < 0.0);
    }

    #[test]
    fn test_blink_rate_and_max_close_run() {
        let mut d = Driver::new();
        for _ in 0..3 {
            d.run(0.9, 10);
            d.run(0.1, 3);
        }
        d.run(0.9, 2);
        let out = d.step(0.9);
        assert!((out.blink_rate_30s - 3.0 / 30.0).abs() < 1e-9);
        assert!((out.max_close_run_10s - 3.0 / 15.0).abs() < 1e-9);
    }
}
