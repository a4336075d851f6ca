//! Active liveness verification via a sequence of head gestures.
//!
//! The subject is prompted to turn their head left, then right, then blink.
//! Each gesture is read from the landmark geometry of a single frame (head
//! turns) or a short run of consecutive frames (blink). The session only
//! moves forward:
//!
//! ```text
//! AwaitingLeftTurn -> AwaitingRightTurn -> AwaitingBlink -> Complete
//! ```
//!
//! After a head turn is confirmed, the next state waits out a settle delay
//! before it evaluates anything, so the tail of the physical motion cannot
//! re-trigger a gesture. The delay is checked against the elapsed time the
//! caller passes in; nothing here sleeps or reads a clock.
//!
//! # Threat Coverage
//!
//! None. This is a cooperative presence check; photos and video replays of
//! the gesture sequence are not detected.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{LivenessConfig, OrientationPolicy};
use crate::landmarks::LandmarkSample;
use crate::metrics::{self, GeometryError};

const PROMPT_TURN_LEFT: &str = "Please turn your face left";
const PROMPT_TURN_RIGHT: &str = "Now turn your face right";
const PROMPT_BLINK: &str = "Now blink your eyes";
const PROMPT_COMPLETE: &str = "Verification complete";

/// Position of a session in the gesture sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    AwaitingLeftTurn,
    AwaitingRightTurn,
    AwaitingBlink,
    Complete,
}

impl GestureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingLeftTurn => "awaiting_left_turn",
            Self::AwaitingRightTurn => "awaiting_right_turn",
            Self::AwaitingBlink => "awaiting_blink",
            Self::Complete => "complete",
        }
    }

    /// Prompt shown to the subject while in this state.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::AwaitingLeftTurn => PROMPT_TURN_LEFT,
            Self::AwaitingRightTurn => PROMPT_TURN_RIGHT,
            Self::AwaitingBlink => PROMPT_BLINK,
            Self::Complete => PROMPT_COMPLETE,
        }
    }

    /// The gesture that completes this state, if any.
    pub fn pending_gesture(&self) -> Option<Gesture> {
        match self {
            Self::AwaitingLeftTurn => Some(Gesture::Left),
            Self::AwaitingRightTurn => Some(Gesture::Right),
            Self::AwaitingBlink => Some(Gesture::Blink),
            Self::Complete => None,
        }
    }

    fn next(&self) -> Self {
        match self {
            Self::AwaitingLeftTurn => Self::AwaitingRightTurn,
            Self::AwaitingRightTurn => Self::AwaitingBlink,
            Self::AwaitingBlink | Self::Complete => Self::Complete,
        }
    }
}

impl std::fmt::Display for GestureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Left,
    Right,
    Blink,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Blink => "blink",
        }
    }

    /// Status line shown once this gesture is confirmed.
    pub fn success_text(&self) -> &'static str {
        match self {
            Self::Left => "Face turned left - Success!",
            Self::Right => "Face turned right - Success!",
            Self::Blink => "Blink detected - Success!",
        }
    }
}

/// Emitted once per confirmed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from: GestureState,
    pub to: GestureState,
    pub gesture: Gesture,
}

/// Progress of one verification attempt. Only [`LivenessMachine`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: GestureState,
    consecutive_blink_frames: u32,
    status_text: String,
    instruction_text: String,
}

impl Session {
    fn new() -> Self {
        Self {
            state: GestureState::AwaitingLeftTurn,
            consecutive_blink_frames: 0,
            status_text: String::new(),
            instruction_text: GestureState::AwaitingLeftTurn.instruction().to_string(),
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Consecutive frames below the blink threshold. Always 0 outside
    /// [`GestureState::AwaitingBlink`].
    pub fn consecutive_blink_frames(&self) -> u32 {
        self.consecutive_blink_frames
    }

    /// Outcome of the last confirmed gesture; empty once the settle delay
    /// has passed.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn instruction_text(&self) -> &str {
        &self.instruction_text
    }
}

/// Gesture sequence state machine for a single tracked face.
#[derive(Debug, Clone)]
pub struct LivenessMachine {
    config: LivenessConfig,
    session: Session,
}

impl LivenessMachine {
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> GestureState {
        self.session.state
    }

    pub fn is_complete(&self) -> bool {
        self.session.state == GestureState::Complete
    }

    /// Start a new session at [`GestureState::AwaitingLeftTurn`].
    pub fn reset(&mut self) {
        self.session = Session::new();
    }

    /// Evaluate one landmark sample against the current state.
    ///
    /// `since_last_transition` is the time since the previous confirmed
    /// gesture (or since the session started). Returns the transition this
    /// sample caused, if any. Samples with degenerate geometry are skipped
    /// without touching the session.
    pub fn process_sample(
        &mut self,
        sample: &LandmarkSample,
        since_last_transition: Duration,
    ) -> Option<TransitionEvent> {
        let state = self.session.state;
        let gesture = state.pending_gesture()?;

        let settle = match gesture {
            Gesture::Left => Duration::ZERO,
            Gesture::Right => self.config.left_settle(),
            Gesture::Blink => self.config.right_settle(),
        };
        if since_last_transition < settle {
            return None;
        }
        self.session.status_text.clear();

        let confirmed = match gesture {
            Gesture::Left | Gesture::Right => self.check_orientation(gesture, sample),
            Gesture::Blink => self.check_blink(sample),
        };

        match confirmed {
            Ok(true) => Some(self.advance(gesture)),
            Ok(false) => None,
            Err(e) => {
                tracing::debug!(state = %state, error = %e, "inconclusive sample skipped");
                None
            }
        }
    }

    fn check_orientation(
        &self,
        gesture: Gesture,
        sample: &LandmarkSample,
    ) -> Result<bool, GeometryError> {
        let policy = &self.config.orientation;
        let metric = match policy {
            OrientationPolicy::RollAngle { .. } => metrics::roll_angle_degrees(sample)?,
            OrientationPolicy::RatioLow { .. } | OrientationPolicy::RatioHigh { .. } => {
                metrics::orientation_ratio(sample)?
            }
        };

        let turned = match gesture {
            Gesture::Left => policy.is_left_turn(metric),
            _ => policy.is_right_turn(metric),
        };
        tracing::trace!(gesture = gesture.as_str(), metric, turned, "orientation evaluated");
        Ok(turned)
    }

    fn check_blink(&mut self, sample: &LandmarkSample) -> Result<bool, GeometryError> {
        let ear = metrics::eye_aspect_ratio(sample)?;

        if ear < self.config.blink_threshold {
            self.session.consecutive_blink_frames =
                self.session.consecutive_blink_frames.saturating_add(1);
        } else {
            self.session.consecutive_blink_frames = 0;
        }
        tracing::trace!(
            ear,
            frames = self.session.consecutive_blink_frames,
            "blink evaluated"
        );

        Ok(self.session.consecutive_blink_frames >= self.config.min_blink_frames)
    }

    fn advance(&mut self, gesture: Gesture) -> TransitionEvent {
        let from = self.session.state;
        let to = from.next();

        self.session.state = to;
        self.session.consecutive_blink_frames = 0;
        self.session.status_text = gesture.success_text().to_string();
        self.session.instruction_text = to.instruction().to_string();

        tracing::info!(from = %from, to = %to, gesture = gesture.as_str(), "gesture confirmed");

        TransitionEvent { from, to, gesture }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point2D;

    const SETTLED: Duration = Duration::from_secs(10);

    fn sample(left: (f32, f32), right: (f32, f32), nose: (f32, f32)) -> LandmarkSample {
        LandmarkSample::new(
            Point2D::new(left.0, left.1),
            Point2D::new(right.0, right.1),
            Point2D::new(nose.0, nose.1),
        )
    }

    fn frontal() -> LandmarkSample {
        sample((100.0, 200.0), (200.0, 200.0), (150.0, 205.0))
    }

    fn turned_left() -> LandmarkSample {
        sample((100.0, 200.0), (200.0, 200.0), (105.0, 205.0))
    }

    fn turned_right() -> LandmarkSample {
        sample((100.0, 200.0), (200.0, 200.0), (195.0, 205.0))
    }

    /// Eye aspect ratio 0.03, below the default blink threshold.
    fn blink_frame() -> LandmarkSample {
        sample((100.0, 200.0), (200.0, 203.0), (150.0, 205.0))
    }

    /// Eye aspect ratio 0.2, above the default blink threshold.
    fn open_frame() -> LandmarkSample {
        sample((100.0, 200.0), (200.0, 220.0), (150.0, 205.0))
    }

    /// Sample whose orientation ratio is exactly `ratio`: the nose sits on
    /// the eye line, `ratio * 100 / (1 + ratio)` px from the left eye.
    fn with_ratio(ratio: f32) -> LandmarkSample {
        let from_left = 100.0 * ratio / (1.0 + ratio);
        sample((0.0, 0.0), (100.0, 0.0), (from_left, 0.0))
    }

    fn machine_at_blink() -> LivenessMachine {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        m.process_sample(&turned_left(), SETTLED).unwrap();
        m.process_sample(&turned_right(), SETTLED).unwrap();
        assert_eq!(m.state(), GestureState::AwaitingBlink);
        m
    }

    #[test]
    fn test_new_session() {
        let m = LivenessMachine::new(LivenessConfig::default());
        assert_eq!(m.state(), GestureState::AwaitingLeftTurn);
        assert_eq!(m.session().consecutive_blink_frames(), 0);
        assert_eq!(m.session().status_text(), "");
        assert_eq!(m.session().instruction_text(), "Please turn your face left");
        assert!(!m.is_complete());
    }

    #[test]
    fn test_frontal_face_does_not_confirm_left() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        assert!(m.process_sample(&frontal(), Duration::ZERO).is_none());
        assert_eq!(m.state(), GestureState::AwaitingLeftTurn);
    }

    #[test]
    fn test_left_turn_confirmed() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        let event = m.process_sample(&turned_left(), Duration::ZERO).unwrap();
        assert_eq!(
            event,
            TransitionEvent {
                from: GestureState::AwaitingLeftTurn,
                to: GestureState::AwaitingRightTurn,
                gesture: Gesture::Left,
            }
        );
        assert_eq!(m.state(), GestureState::AwaitingRightTurn);
        assert_eq!(m.session().status_text(), "Face turned left - Success!");
        assert_eq!(m.session().instruction_text(), "Now turn your face right");
    }

    #[test]
    fn test_left_threshold_boundary() {
        let eps = 0.01;

        let mut m = LivenessMachine::new(LivenessConfig::default());
        assert!(m.process_sample(&with_ratio(0.6 + eps), SETTLED).is_none());
        assert_eq!(m.state(), GestureState::AwaitingLeftTurn);

        assert!(m.process_sample(&with_ratio(0.6 - eps), SETTLED).is_some());
        assert_eq!(m.state(), GestureState::AwaitingRightTurn);
    }

    #[test]
    fn test_right_turn_waits_for_settle_delay() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        m.process_sample(&turned_left(), Duration::ZERO).unwrap();

        // Within the 2 s settle window a right turn is ignored and the
        // success message stays up.
        assert!(m
            .process_sample(&turned_right(), Duration::from_millis(1999))
            .is_none());
        assert_eq!(m.state(), GestureState::AwaitingRightTurn);
        assert_eq!(m.session().status_text(), "Face turned left - Success!");

        // Once settled the status clears and the sample is evaluated.
        assert!(m
            .process_sample(&frontal(), Duration::from_millis(2000))
            .is_none());
        assert_eq!(m.session().status_text(), "");

        let event = m
            .process_sample(&turned_right(), Duration::from_millis(2200))
            .unwrap();
        assert_eq!(event.gesture, Gesture::Right);
        assert_eq!(event.to, GestureState::AwaitingBlink);
        assert_eq!(m.session().status_text(), "Face turned right - Success!");
        assert_eq!(m.session().instruction_text(), "Now blink your eyes");
    }

    #[test]
    fn test_left_turn_does_not_confirm_right() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        m.process_sample(&turned_left(), Duration::ZERO).unwrap();
        assert!(m.process_sample(&turned_left(), SETTLED).is_none());
        assert_eq!(m.state(), GestureState::AwaitingRightTurn);
    }

    #[test]
    fn test_blink_waits_for_settle_delay() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        m.process_sample(&turned_left(), SETTLED).unwrap();
        m.process_sample(&turned_right(), SETTLED).unwrap();

        for _ in 0..5 {
            assert!(m
                .process_sample(&blink_frame(), Duration::from_millis(2999))
                .is_none());
        }
        assert_eq!(m.session().consecutive_blink_frames(), 0);
        assert_eq!(m.state(), GestureState::AwaitingBlink);
    }

    #[test]
    fn test_blink_needs_min_frames() {
        let mut m = machine_at_blink();
        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert_eq!(m.session().consecutive_blink_frames(), 2);
        assert_eq!(m.state(), GestureState::AwaitingBlink);

        let event = m.process_sample(&blink_frame(), SETTLED).unwrap();
        assert_eq!(
            event,
            TransitionEvent {
                from: GestureState::AwaitingBlink,
                to: GestureState::Complete,
                gesture: Gesture::Blink,
            }
        );
        assert!(m.is_complete());
        assert_eq!(m.session().consecutive_blink_frames(), 0);
        assert_eq!(m.session().status_text(), "Blink detected - Success!");
        assert_eq!(m.session().instruction_text(), "Verification complete");
    }

    #[test]
    fn test_interrupted_blink_streak_restarts() {
        let mut m = machine_at_blink();
        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert!(m.process_sample(&open_frame(), SETTLED).is_none());
        assert_eq!(m.session().consecutive_blink_frames(), 0);

        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert!(m.process_sample(&blink_frame(), SETTLED).is_none());
        assert!(m.process_sample(&blink_frame(), SETTLED).is_some());
        assert!(m.is_complete());
    }

    #[test]
    fn test_degenerate_blink_frame_leaves_counter() {
        let mut m = machine_at_blink();
        m.process_sample(&blink_frame(), SETTLED);
        m.process_sample(&blink_frame(), SETTLED);

        // Zero horizontal eye separation: skipped, streak kept
        let degenerate = sample((150.0, 200.0), (150.0, 210.0), (150.0, 230.0));
        assert!(m.process_sample(&degenerate, SETTLED).is_none());
        assert_eq!(m.session().consecutive_blink_frames(), 2);
        assert_eq!(m.state(), GestureState::AwaitingBlink);
    }

    #[test]
    fn test_degenerate_orientation_frame_skipped() {
        let mut m = LivenessMachine::new(LivenessConfig::default());
        let on_right_eye = sample((100.0, 200.0), (200.0, 200.0), (200.0, 200.0));
        assert!(m.process_sample(&on_right_eye, SETTLED).is_none());

        let nan = sample((f32::NAN, 200.0), (200.0, 200.0), (150.0, 205.0));
        assert!(m.process_sample(&nan, SETTLED).is_none());

        assert_eq!(m.state(), GestureState::AwaitingLeftTurn);
        assert_eq!(m.session().status_text(), "");
    }

    #[test]
    fn test_large_frontal_coordinates_do_not_confirm_left() {
        // Ratio 0.75; squared distances would exceed f32::MAX
        let mut m = LivenessMachine::new(LivenessConfig::default());
        let huge = sample((0.0, 0.0), (3.5e19, 0.0), (1.5e19, 0.0));
        assert!(m.process_sample(&huge, SETTLED).is_none());
        assert_eq!(m.state(), GestureState::AwaitingLeftTurn);
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut m = machine_at_blink();
        for _ in 0..3 {
            m.process_sample(&blink_frame(), SETTLED);
        }
        assert!(m.is_complete());
        let before = m.session().clone();

        for s in [turned_left(), turned_right(), blink_frame(), frontal()] {
            assert!(m.process_sample(&s, SETTLED).is_none());
            assert!(m.process_sample(&s, Duration::ZERO).is_none());
        }
        assert_eq!(m.session(), &before);
    }

    #[test]
    fn test_reset_matches_fresh_session() {
        let fresh = LivenessMachine::new(LivenessConfig::default());

        let mut m = machine_at_blink();
        m.process_sample(&blink_frame(), SETTLED);
        m.reset();
        assert_eq!(m.session(), fresh.session());

        // Reset is idempotent and behaves like a fresh machine afterwards
        m.reset();
        assert_eq!(m.session(), fresh.session());
        let event = m.process_sample(&turned_left(), Duration::ZERO).unwrap();
        assert_eq!(event.gesture, Gesture::Left);
    }

    #[test]
    fn test_ratio_high_policy() {
        let config = LivenessConfig {
            orientation: OrientationPolicy::ratio_high(),
            ..LivenessConfig::default()
        };
        let mut m = LivenessMachine::new(config);

        // The raw-frame left turn is a right turn under mirroring
        assert!(m.process_sample(&turned_left(), SETTLED).is_none());
        assert!(m.process_sample(&with_ratio(6.0), SETTLED).is_none());
        assert_eq!(
            m.process_sample(&with_ratio(7.0), SETTLED).map(|e| e.gesture),
            Some(Gesture::Left)
        );
        assert_eq!(
            m.process_sample(&with_ratio(0.5), SETTLED).map(|e| e.gesture),
            Some(Gesture::Right)
        );
    }

    #[test]
    fn test_roll_angle_policy() {
        let config = LivenessConfig {
            orientation: OrientationPolicy::roll_angle(),
            ..LivenessConfig::default()
        };
        let mut m = LivenessMachine::new(config);

        // atan2(-20, 100) is about -11.3 degrees
        let tilted_up = sample((100.0, 200.0), (200.0, 180.0), (150.0, 205.0));
        let tilted_down = sample((100.0, 200.0), (200.0, 220.0), (150.0, 205.0));

        assert!(m.process_sample(&frontal(), SETTLED).is_none());
        assert!(m.process_sample(&tilted_down, SETTLED).is_none());
        assert_eq!(
            m.process_sample(&tilted_up, SETTLED).map(|e| e.gesture),
            Some(Gesture::Left)
        );
        assert_eq!(
            m.process_sample(&tilted_down, SETTLED).map(|e| e.gesture),
            Some(Gesture::Right)
        );
    }

    #[test]
    fn test_state_never_regresses() {
        let frames = [
            frontal(),
            turned_left(),
            turned_right(),
            blink_frame(),
            open_frame(),
            sample((100.0, 200.0), (100.0, 200.0), (100.0, 200.0)),
        ];
        let mut m = LivenessMachine::new(LivenessConfig::default());
        let mut seed: u32 = 0x2545_f491;
        let mut previous = m.state();

        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let frame = &frames[(seed >> 16) as usize % frames.len()];
            let elapsed = Duration::from_millis(u64::from(seed >> 20));

            if let Some(event) = m.process_sample(frame, elapsed) {
                assert_eq!(event.from, previous);
                assert!(event.to > event.from);
            }
            assert!(m.state() >= previous);
            previous = m.state();
        }
    }
}
