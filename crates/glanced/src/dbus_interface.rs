use glance_core::{LandmarkSample, LivenessConfig, Point2D};
use zbus::interface;

use crate::engine::EngineHandle;

/// D-Bus interface for the Glance liveness daemon.
///
/// Bus name: org.freedesktop.Glance1
/// Object path: /org/freedesktop/Glance1
///
/// A landmark detector pushes one sample per processed video frame; the
/// presentation layer polls `Status` and `Events` to drive prompts and
/// audio cues.
pub struct GlanceService {
    pub engine: EngineHandle,
    pub liveness: LivenessConfig,
}

fn failed(e: impl std::fmt::Display) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(e.to_string())
}

#[interface(name = "org.freedesktop.Glance1")]
impl GlanceService {
    /// Submit the eye and nose landmarks of the most prominent face in the
    /// current frame.
    ///
    /// Returns the frame outcome as JSON: whether the frame passed the
    /// throttle, and the transition it caused, if any.
    async fn push_sample(
        &self,
        left_x: f64,
        left_y: f64,
        right_x: f64,
        right_y: f64,
        nose_x: f64,
        nose_y: f64,
    ) -> zbus::fdo::Result<String> {
        let sample = LandmarkSample::new(
            Point2D::new(left_x as f32, left_y as f32),
            Point2D::new(right_x as f32, right_y as f32),
            Point2D::new(nose_x as f32, nose_y as f32),
        );
        if !sample.is_finite() {
            tracing::warn!("push_sample: non-finite landmark coordinates");
            return Err(zbus::fdo::Error::InvalidArgs(
                "landmark coordinates must be finite".to_string(),
            ));
        }

        let outcome = self.engine.push_sample(sample).await.map_err(|e| {
            tracing::error!(error = %e, "push_sample failed");
            failed(e)
        })?;

        if let Some(event) = outcome.event {
            tracing::debug!(
                gesture = event.gesture.as_str(),
                to = %event.to,
                "push_sample: transition returned to caller"
            );
        }
        serde_json::to_string(&outcome).map_err(failed)
    }

    /// Report a processed frame in which no face was found.
    async fn no_face(&self) -> zbus::fdo::Result<String> {
        let outcome = self.engine.no_face().await.map_err(|e| {
            tracing::error!(error = %e, "no_face failed");
            failed(e)
        })?;
        serde_json::to_string(&outcome).map_err(failed)
    }

    /// Start a new verification session. Returns the new session id.
    async fn reset(&self) -> zbus::fdo::Result<String> {
        tracing::info!("reset requested");
        let id = self.engine.reset().await.map_err(|e| {
            tracing::error!(error = %e, "reset failed");
            failed(e)
        })?;
        Ok(id.to_string())
    }

    /// Return the current session snapshot and thresholds as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let snapshot = self.engine.snapshot();
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "session": snapshot,
            "config": self.liveness,
        })
        .to_string())
    }

    /// Return recent transition events as a JSON array, oldest first.
    async fn events(&self) -> zbus::fdo::Result<String> {
        let events = self.engine.events().await.map_err(failed)?;
        serde_json::to_string(&events).map_err(failed)
    }
}
