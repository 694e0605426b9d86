//! Runtime configuration
//!
//! Tuning knobs shared by the scheduler, reactive values and players. Every
//! field has a default, so a partial `motio.toml` is enough:
//!
//! ```toml
//! max_resolve_delay_ms = 60.0
//! instant_animations = true
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Velocity is only tracked for values updated within this window.
pub const MAX_VELOCITY_DELTA_MS: f64 = 30.0;

/// Keyframe resolution slower than this restarts the animation clock at resolution time.
pub const MAX_RESOLVE_DELAY_MS: f64 = 40.0;

/// Upper bound for the delta reported between two ticks.
pub const MAX_FRAME_DELTA_MS: f64 = 40.0;

/// Frame delta reported for the first tick after waking up.
pub const DEFAULT_FRAME_DELTA_MS: f64 = 1000.0 / 60.0;

/// Global runtime configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Window within which a value's velocity is considered valid
    pub max_velocity_delta_ms: f64,
    /// Resolution budget before the start time moves to the resolution time
    pub max_resolve_delay_ms: f64,
    /// Clamp for the per-tick delta
    pub max_frame_delta_ms: f64,
    /// Spacing of the two samples used to recover velocity from native playback
    pub velocity_sample_delta_ms: f64,
    /// Sampling interval when baking generators into native keyframes
    pub native_sample_resolution_ms: f64,
    /// Skip every animation straight to its final keyframe
    pub instant_animations: bool,
    /// Report a fixed 1000/60 delta instead of measuring it
    pub manual_timing: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_velocity_delta_ms: MAX_VELOCITY_DELTA_MS,
            max_resolve_delay_ms: MAX_RESOLVE_DELAY_MS,
            max_frame_delta_ms: MAX_FRAME_DELTA_MS,
            velocity_sample_delta_ms: 5.0,
            native_sample_resolution_ms: 10.0,
            instant_animations: false,
            manual_timing: false,
        }
    }
}

impl MotionConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = MotionConfig::default();
        assert_eq!(config.max_velocity_delta_ms, MAX_VELOCITY_DELTA_MS);
        assert_eq!(config.max_resolve_delay_ms, 40.0);
        assert_eq!(config.velocity_sample_delta_ms, 5.0);
        assert!(!config.instant_animations);
    }

    #[test]
    fn test_partial_toml() {
        let config = MotionConfig::from_toml_str(
            "velocity_sample_delta_ms = 8.0\ninstant_animations = true\n",
        )
        .unwrap();
        assert_eq!(config.velocity_sample_delta_ms, 8.0);
        assert!(config.instant_animations);
        assert_eq!(config.max_frame_delta_ms, 40.0);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(MotionConfig::from_toml_str("max_frame_delta_ms = \"fast\"").is_err());
    }
}
