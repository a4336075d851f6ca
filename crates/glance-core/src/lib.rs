//! Gesture liveness verification over facial landmark samples.
//!
//! The subject is asked to turn their head left, then right, then blink.
//! [`LivenessMachine`] turns a stream of per-frame [`LandmarkSample`]s into
//! those three gesture confirmations; [`SessionDriver`] wraps it with the
//! frame throttle and settle clock needed to run it from a live feed.

pub mod config;
pub mod driver;
pub mod landmarks;
pub mod liveness;
pub mod metrics;
pub mod throttle;

pub use config::{ConfigError, LivenessConfig, OrientationPolicy};
pub use driver::{FrameOutcome, LandmarkSampler, SessionDriver};
pub use landmarks::{LandmarkSample, Observation, Point2D};
pub use liveness::{Gesture, GestureState, LivenessMachine, Session, TransitionEvent};
pub use metrics::GeometryError;
pub use throttle::FrameThrottle;
