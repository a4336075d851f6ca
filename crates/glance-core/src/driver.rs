//! Thin frame-paced driver around [`LivenessMachine`].
//!
//! The driver owns everything time-related: it throttles incoming frames,
//! remembers when the last gesture was confirmed, and hands the machine the
//! elapsed time so the settle delay is a plain comparison on every tick.
//! It never sleeps; callers decide when frames arrive.

use serde::Serialize;
use std::time::Instant;

use crate::config::LivenessConfig;
use crate::landmarks::{LandmarkSample, Observation};
use crate::liveness::{LivenessMachine, Session, TransitionEvent};
use crate::throttle::FrameThrottle;

/// Source of landmark observations for video frames of type `F`.
///
/// Implementations typically run a face landmark detector on the frame and
/// keep the most prominent face.
pub trait LandmarkSampler<F: ?Sized> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn sample(&mut self, frame: &F) -> Result<Observation, Self::Error>;
}

/// What happened to one offered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameOutcome {
    /// `false` if the frame arrived inside the throttle interval and was
    /// dropped.
    pub accepted: bool,
    pub event: Option<TransitionEvent>,
}

impl FrameOutcome {
    const DROPPED: Self = Self {
        accepted: false,
        event: None,
    };
}

#[derive(Debug, Clone)]
pub struct SessionDriver {
    machine: LivenessMachine,
    throttle: FrameThrottle,
    last_transition: Instant,
}

impl SessionDriver {
    /// Start a session at `now`. The session start counts as the last
    /// transition for settle-delay purposes.
    pub fn new(config: LivenessConfig, now: Instant) -> Self {
        let throttle = FrameThrottle::new(config.min_sample_interval());
        Self {
            machine: LivenessMachine::new(config),
            throttle,
            last_transition: now,
        }
    }

    pub fn machine(&self) -> &LivenessMachine {
        &self.machine
    }

    pub fn session(&self) -> &Session {
        self.machine.session()
    }

    pub fn reset(&mut self, now: Instant) {
        self.machine.reset();
        self.throttle.clear();
        self.last_transition = now;
        tracing::info!("liveness session reset");
    }

    /// Feed the detector's observation for a frame that arrived at `now`.
    pub fn offer(&mut self, now: Instant, observation: Observation) -> FrameOutcome {
        if !self.admit(now) {
            return FrameOutcome::DROPPED;
        }
        self.observe(now, observation)
    }

    /// Throttle first, then run `sampler` on the frame only if it was
    /// admitted. Sampler errors are returned unchanged; the session is not
    /// touched.
    pub fn poll<F, S>(
        &mut self,
        now: Instant,
        frame: &F,
        sampler: &mut S,
    ) -> Result<FrameOutcome, S::Error>
    where
        F: ?Sized,
        S: LandmarkSampler<F>,
    {
        if !self.admit(now) {
            return Ok(FrameOutcome::DROPPED);
        }
        let observation = sampler.sample(frame)?;
        Ok(self.observe(now, observation))
    }

    fn admit(&mut self, now: Instant) -> bool {
        let admitted = self.throttle.admit(now);
        if !admitted {
            tracing::trace!("frame dropped by throttle");
        }
        admitted
    }

    fn observe(&mut self, now: Instant, observation: Observation) -> FrameOutcome {
        let event = match observation {
            Observation::Face(sample) => self.evaluate(now, &sample),
            Observation::NoFace => {
                tracing::debug!(state = %self.machine.state(), "no face in frame");
                None
            }
        };

        FrameOutcome {
            accepted: true,
            event,
        }
    }

    fn evaluate(&mut self, now: Instant, sample: &LandmarkSample) -> Option<TransitionEvent> {
        let elapsed = now.saturating_duration_since(self.last_transition);
        let event = self.machine.process_sample(sample, elapsed)?;
        self.last_transition = now;
        Some(event)
    }
}
