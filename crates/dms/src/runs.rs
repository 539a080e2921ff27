//! Completed closure/opening episodes

use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};

/// One completed episode (eye closure or mouth opening)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Timestamp of the tick that ended the episode
    pub end_time_s: f64,
    pub length_frames: usize,
    pub duration_s: f64,
}

/// Time-bounded history of completed runs, oldest first
#[derive(Debug, Clone)]
pub struct RunLog {
    runs: RingBuffer<Run>,
    horizon_s: f64,
}

impl RunLog {
    /// Keep runs ending within `horizon_s` of the latest tick
    pub fn new(capacity: usize, horizon_s: f64) -> Self {
        Self {
            runs: RingBuffer::new(capacity.max(1)),
            horizon_s,
        }
    }

    pub fn record(&mut self, run: Run) {
        self.runs.push(run);
    }

    /// Drop runs that ended before `now_s - horizon`
    pub fn prune(&mut self, now_s: f64) -> usize {
        let cutoff = now_s - self.horizon_s;
        self.runs.evict_while(|run| run.end_time_s < cutoff)
    }

    /// Runs ending within the last `window_s` seconds
    pub fn recent(&self, now_s: f64, window_s: f64) -> impl Iterator<Item = &Run> + '_ {
        let cutoff = now_s - window_s;
        self.runs.iter().filter(move |run| run.end_time_s >= cutoff)
    }

    pub fn last(&self) -> Option<&Run> {
        self.runs.back()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
