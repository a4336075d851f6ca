use std::time::{Duration, Instant};

/// Minimum-interval gate for incoming video frames.
///
/// A frame is admitted when at least `min_interval` has passed since the
/// last admitted frame. Rejected frames are dropped, not queued, so a burst
/// of fast frames costs nothing beyond the check itself.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    min_interval: Duration,
    last_admitted: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    /// Return `true` if a frame arriving at `now` should be processed.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_admitted {
            // An earlier `now` than the last admission (clock skew between
            // callers) counts as zero elapsed time.
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }

    /// Forget the last admitted frame; the next frame is always admitted.
    pub fn clear(&mut self) {
        self.last_admitted = None;
    }
}
