use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How head yaw is read from landmarks, and the thresholds that confirm a
/// left or right turn.
///
/// Which ratio policy applies depends on whether the landmark coordinates
/// come from the raw camera frame or from a horizontally mirrored (selfie
/// view) frame. Mirroring swaps which side of 1.0 the orientation ratio
/// moves to for the same physical turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OrientationPolicy {
    /// Raw (non-mirrored) frame: left turn when the orientation ratio drops
    /// below `left_below`, right turn when it rises above `right_above`.
    RatioLow {
        #[serde(default = "default_left_below")]
        left_below: f32,
        #[serde(default = "default_right_above")]
        right_above: f32,
    },
    /// Mirrored frame: left turn when the orientation ratio rises above
    /// `left_above`, right turn when it drops below `right_below`.
    RatioHigh {
        #[serde(default = "default_left_above")]
        left_above: f32,
        #[serde(default = "default_right_below")]
        right_below: f32,
    },
    /// Eye-line roll angle in degrees instead of the orientation ratio.
    RollAngle {
        #[serde(default = "default_left_below_deg")]
        left_below_deg: f32,
        #[serde(default = "default_right_above_deg")]
        right_above_deg: f32,
    },
}

fn default_left_below() -> f32 {
    0.6
}

fn default_right_above() -> f32 {
    1.4
}

fn default_left_above() -> f32 {
    6.2
}

fn default_right_below() -> f32 {
    0.63
}

fn default_left_below_deg() -> f32 {
    -10.0
}

fn default_right_above_deg() -> f32 {
    10.0
}

impl OrientationPolicy {
    pub fn ratio_low() -> Self {
        Self::RatioLow {
            left_below: default_left_below(),
            right_above: default_right_above(),
        }
    }

    pub fn ratio_high() -> Self {
        Self::RatioHigh {
            left_above: default_left_above(),
            right_below: default_right_below(),
        }
    }

    pub fn roll_angle() -> Self {
        Self::RollAngle {
            left_below_deg: default_left_below_deg(),
            right_above_deg: default_right_above_deg(),
        }
    }

    /// Whether `metric` confirms a left turn under this policy.
    pub fn is_left_turn(&self, metric: f32) -> bool {
        match *self {
            Self::RatioLow { left_below, .. } => metric < left_below,
            Self::RatioHigh { left_above, .. } => metric > left_above,
            Self::RollAngle { left_below_deg, .. } => metric < left_below_deg,
        }
    }

    /// Whether `metric` confirms a right turn under this policy.
    pub fn is_right_turn(&self, metric: f32) -> bool {
        match *self {
            Self::RatioLow { right_above, .. } => metric > right_above,
            Self::RatioHigh { right_below, .. } => metric < right_below,
            Self::RollAngle {
                right_above_deg, ..
            } => metric > right_above_deg,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::RatioLow {
                left_below,
                right_above,
            } => {
                positive("orientation.left_below", left_below)?;
                positive("orientation.right_above", right_above)?;
                if left_below >= right_above {
                    return Err(ConfigError::Invalid(format!(
                        "orientation.left_below ({left_below}) must be below orientation.right_above ({right_above})"
                    )));
                }
            }
            Self::RatioHigh {
                left_above,
                right_below,
            } => {
                positive("orientation.left_above", left_above)?;
                positive("orientation.right_below", right_below)?;
                if right_below >= left_above {
                    return Err(ConfigError::Invalid(format!(
                        "orientation.right_below ({right_below}) must be below orientation.left_above ({left_above})"
                    )));
                }
            }
            Self::RollAngle {
                left_below_deg,
                right_above_deg,
            } => {
                if !left_below_deg.is_finite() || !right_above_deg.is_finite() {
                    return Err(ConfigError::Invalid(
                        "orientation roll angles must be finite".to_string(),
                    ));
                }
                if left_below_deg >= right_above_deg {
                    return Err(ConfigError::Invalid(format!(
                        "orientation.left_below_deg ({left_below_deg}) must be below orientation.right_above_deg ({right_above_deg})"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for OrientationPolicy {
    fn default() -> Self {
        Self::ratio_low()
    }
}

/// Thresholds and timing for one liveness session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LivenessConfig {
    pub orientation: OrientationPolicy,
    /// Settle delay after the left turn, before the right turn is evaluated.
    pub left_settle_ms: u64,
    /// Settle delay after the right turn, before blinks are counted.
    pub right_settle_ms: u64,
    /// Eye aspect ratio below which a frame counts towards a blink.
    pub blink_threshold: f32,
    /// Consecutive qualifying frames needed to confirm a blink.
    pub min_blink_frames: u32,
    /// Frames arriving closer together than this are dropped.
    pub min_sample_interval_ms: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            orientation: OrientationPolicy::default(),
            left_settle_ms: 2000,
            right_settle_ms: 3000,
            blink_threshold: 0.07,
            min_blink_frames: 3,
            min_sample_interval_ms: 200,
        }
    }
}

impl LivenessConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orientation.validate()?;
        positive("blink_threshold", self.blink_threshold)?;
        if self.min_blink_frames == 0 {
            return Err(ConfigError::Invalid(
                "min_blink_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn left_settle(&self) -> Duration {
        Duration::from_millis(self.left_settle_ms)
    }

    pub fn right_settle(&self) -> Duration {
        Duration::from_millis(self.right_settle_ms)
    }

    pub fn min_sample_interval(&self) -> Duration {
        Duration::from_millis(self.min_sample_interval_ms)
    }
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}
