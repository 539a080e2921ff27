//! Offline replay of recorded probe outputs
//!
//! Input is newline-delimited JSON, one tick per line:
//!
//! ```json
//! {"timestamp_s": 0.0667, "yaw_deg": 1.2, "pitch_deg": -3.0, "roll_deg": 0.4,
//!  "eye_openness": 0.91, "yawn_probability": 0.05}
//! ```
//!
//! Any probe field may be missing or `null`. Each accepted tick produces one
//! JSON analysis line on the output.

use anyhow::Context;
use dms::{AlertnessState, DmsError, DmsSession, RawFrame};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// One recorded tick
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TickRecord {
    pub timestamp_s: f64,
    #[serde(default)]
    pub yaw_deg: Option<f64>,
    #[serde(default)]
    pub pitch_deg: Option<f64>,
    #[serde(default)]
    pub roll_deg: Option<f64>,
    #[serde(default)]
    pub eye_openness: Option<f64>,
    #[serde(default)]
    pub yawn_probability: Option<f64>,
}

impl From<&TickRecord> for RawFrame {
    fn from(record: &TickRecord) -> Self {
        RawFrame {
            yaw_deg: record.yaw_deg,
            pitch_deg: record.pitch_deg,
            roll_deg: record.roll_deg,
            eye_openness: record.eye_openness,
            yawn_probability: record.yawn_probability,
        }
    }
}

/// Counters for one replay run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Ticks processed
    pub ticks: usize,
    /// Lines that were not valid tick records
    pub malformed: usize,
    /// Ticks rejected for non-advancing timestamps
    pub rejected: usize,
    pub drowsy_ticks: usize,
    pub alert_ticks: usize,
    pub blinks: usize,
    pub yawns: usize,
}

/// Feed every record from `input` through `session`, writing one analysis line per tick
pub fn replay<R: BufRead, W: Write>(
    session: &mut DmsSession,
    input: R,
    mut output: W,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading input line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: TickRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", index + 1, e);
                summary.malformed += 1;
                continue;
            }
        };

        let analysis = match session.process_tick(&RawFrame::from(&record), record.timestamp_s) {
            Ok(analysis) => analysis,
            Err(DmsError::Tick(e)) => {
                warn!("Skipping line {}: {}", index + 1, e);
                summary.rejected += 1;
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("processing line {}", index + 1)),
        };

        summary.ticks += 1;
        if analysis.alertness == AlertnessState::Drowsy {
            summary.drowsy_ticks += 1;
        }
        if analysis.has_alerts() {
            summary.alert_ticks += 1;
        }
        if analysis.eye.blink_detected {
            summary.blinks += 1;
        }
        if analysis.mouth.yawn_detected {
            summary.yawns += 1;
        }

        serde_json::to_writer(&mut output, &analysis).context("writing analysis")?;
        output.write_all(b"\n").context("writing analysis")?;
    }

    output.flush().context("flushing output")?;
    info!(
        "Replay finished: {} ticks, {} rejected, {} malformed",
        summary.ticks, summary.rejected, summary.malformed
    );
    Ok(summary)
}

/// Initialize logging to stderr; `RUST_LOG` overrides the default `info` level
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // Ignore the error when a subscriber is already installed
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
