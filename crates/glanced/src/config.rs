use std::path::PathBuf;

use glance_core::{ConfigError, LivenessConfig};

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Optional TOML file with liveness thresholds (`GLANCE_CONFIG`).
    pub liveness_file: Option<PathBuf>,
    /// Thresholds and timing for each session, after env overrides.
    pub liveness: LivenessConfig,
    /// Number of transition events kept for `Events()`.
    pub event_history: usize,
    /// Whether the daemon is running on the session bus (development mode).
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `GLANCE_*` environment variables with defaults.
    ///
    /// The TOML file (if any) is read first; individual variables override
    /// its values. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let liveness_file = std::env::var("GLANCE_CONFIG").ok().map(PathBuf::from);

        let mut liveness = match &liveness_file {
            Some(path) => LivenessConfig::load(path)?,
            None => LivenessConfig::default(),
        };

        liveness.left_settle_ms = env_u64("GLANCE_LEFT_SETTLE_MS", liveness.left_settle_ms);
        liveness.right_settle_ms = env_u64("GLANCE_RIGHT_SETTLE_MS", liveness.right_settle_ms);
        liveness.blink_threshold = env_f32("GLANCE_BLINK_THRESHOLD", liveness.blink_threshold);
        liveness.min_blink_frames = env_u32("GLANCE_MIN_BLINK_FRAMES", liveness.min_blink_frames);
        liveness.min_sample_interval_ms = env_u64(
            "GLANCE_MIN_SAMPLE_INTERVAL_MS",
            liveness.min_sample_interval_ms,
        );
        liveness.validate()?;

        Ok(Self {
            liveness_file,
            liveness,
            event_history: env_usize("GLANCE_EVENT_HISTORY", 32),
            session_bus: std::env::var("GLANCE_SESSION_BUS").is_ok(),
        })
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
