//! `glance replay` — run a recorded landmark trace through a session offline.
//!
//! A trace is JSON lines, one video frame per line, in the shape a face
//! landmark detector reports:
//!
//! ```text
//! {"faces": [{"probability": 0.98, "landmarks": [[100,200],[200,200],[150,205]]}]}
//! {"faces": []}
//! ```
//!
//! Landmark order is left eye, right eye, nose, then any extra points.
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{bail, Context, Result};
use glance_core::{
    GestureState, LandmarkSample, LandmarkSampler, LivenessConfig, Observation, SessionDriver,
    TransitionEvent,
};
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid frame: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: face has {count} landmarks, need at least 3")]
    IncompleteLandmarks { line: usize, count: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceFace {
    #[serde(default = "default_probability")]
    pub probability: f32,
    pub landmarks: Vec<[f32; 2]>,
}

fn default_probability() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceFrame {
    #[serde(default)]
    pub faces: Vec<TraceFace>,
    /// 1-based line in the trace file.
    #[serde(skip)]
    pub line: usize,
}

pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceFrame>, TraceError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut frame: TraceFrame =
            serde_json::from_str(trimmed).map_err(|source| TraceError::Parse {
                line: i + 1,
                source,
            })?;
        frame.line = i + 1;
        frames.push(frame);
    }
    Ok(frames)
}

/// Keeps the highest-probability face of each frame.
pub struct ProminentFace;

impl LandmarkSampler<TraceFrame> for ProminentFace {
    type Error = TraceError;

    fn sample(&mut self, frame: &TraceFrame) -> Result<Observation, TraceError> {
        let Some(face) = frame
            .faces
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
        else {
            return Ok(Observation::NoFace);
        };

        let sample = LandmarkSample::from_points(&face.landmarks).ok_or(
            TraceError::IncompleteLandmarks {
                line: frame.line,
                count: face.landmarks.len(),
            },
        )?;
        Ok(Observation::Face(sample))
    }
}

#[derive(Debug)]
pub struct ReplaySummary {
    pub frames: usize,
    pub accepted: usize,
    /// Each confirmed gesture with its offset from the first frame.
    pub events: Vec<(Duration, TransitionEvent)>,
    pub final_state: GestureState,
}

/// Feed `frames` to a fresh session, spacing them `frame_interval` apart.
pub fn replay(
    frames: &[TraceFrame],
    config: LivenessConfig,
    frame_interval: Duration,
) -> Result<ReplaySummary, TraceError> {
    let t0 = Instant::now();
    let mut driver = SessionDriver::new(config, t0);
    let mut sampler = ProminentFace;
    let mut accepted = 0;
    let mut events = Vec::new();

    for (i, frame) in frames.iter().enumerate() {
        let offset = frame_interval.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX));
        let outcome = driver.poll(t0 + offset, frame, &mut sampler)?;
        if outcome.accepted {
            accepted += 1;
        }
        if let Some(event) = outcome.event {
            events.push((offset, event));
        }
    }

    Ok(ReplaySummary {
        frames: frames.len(),
        accepted,
        events,
        final_state: driver.session().state(),
    })
}

/// Run the replay command. Fails if the session does not complete.
pub fn run(trace: &Path, config: Option<&Path>, frame_interval_ms: u64) -> Result<()> {
    let config = match config {
        Some(path) => LivenessConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LivenessConfig::default(),
    };

    let file = std::fs::File::open(trace)
        .with_context(|| format!("failed to open {}", trace.display()))?;
    let frames = read_trace(std::io::BufReader::new(file))
        .with_context(|| format!("failed to read {}", trace.display()))?;
    tracing::debug!(frames = frames.len(), "trace loaded");

    let summary = replay(&frames, config, Duration::from_millis(frame_interval_ms))
        .with_context(|| format!("replay of {} aborted", trace.display()))?;

    for (offset, event) in &summary.events {
        println!(
            "  {:>7.3}s  {:<6} {} -> {}",
            offset.as_secs_f64(),
            event.gesture.as_str(),
            event.from,
            event.to
        );
    }
    println!();
    println!(
        "{} frames, {} evaluated, final state: {}",
        summary.frames, summary.accepted, summary.final_state
    );

    if summary.final_state != GestureState::Complete {
        bail!("session did not complete (stopped at {})", summary.final_state);
    }
    println!("Liveness verified.");
    Ok(())
}
