// THEORY:
// Every threshold the engine uses is a named, tunable policy value rather than a
// literal buried in an algorithm. The defaults reproduce the behavior the system was
// tuned with: a 10-frame motion window, a 5-pixel stationary threshold, a 30-frame
// warm-up, and a 30-point trail. All structs deserialize with per-field defaults so a
// partial config file only overrides what it names.

use crate::error::{Error, Result};
use serde::Deserialize;

/// What happens to an identity's trail once it loses the action role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailPolicy {
    /// The trail is frozen in memory and no longer rendered.
    #[default]
    Retain,
    /// The trail is dropped as soon as another identity (or none) takes the role.
    ClearOnRoleLoss,
}

/// Configuration for the role-classification pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of most recent centroids scored per identity.
    pub motion_window: usize,
    /// Path length (pixels per window) below which an identity is stationary.
    pub stationary_threshold: f64,
    /// Frames recorded before the first classification.
    pub warmup_frames: u64,
    /// Maximum number of points kept per trail.
    pub trail_capacity: usize,
    pub trail_policy: TrailPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            motion_window: 10,
            stationary_threshold: 5.0,
            warmup_frames: 30,
            trail_capacity: 30,
            trail_policy: TrailPolicy::Retain,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.motion_window < 2 {
            return Err(Error::InvalidConfig(format!(
                "motion_window must be at least 2, got {}",
                self.motion_window
            )));
        }
        if !self.stationary_threshold.is_finite() || self.stationary_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "stationary_threshold must be a finite, non-negative distance, got {}",
                self.stationary_threshold
            )));
        }
        if self.trail_capacity == 0 {
            return Err(Error::InvalidConfig("trail_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parameters of the reference IoU tracker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track survives without a matching detection.
    pub max_age: u32,
    /// Matches required before a track is reported.
    pub min_hits: u32,
    /// Minimum IoU for a detection to continue a track.
    pub iou_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { max_age: 30, min_hits: 3, iou_threshold: 0.3 }
    }
}

/// Acceptance rules applied to raw detector output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionFilterConfig {
    pub labels: Vec<String>,
    pub min_confidence: f64,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for DetectionFilterConfig {
    fn default() -> Self {
        Self {
            labels: vec!["sports ball".into(), "ball".into()],
            min_confidence: 0.3,
            min_width: 15.0,
            min_height: 15.0,
        }
    }
}

/// Settings for a model-backed detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Square network input size in pixels.
    pub input_size: u32,
    pub nms_threshold: f32,
    pub filter: DetectionFilterConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8l.onnx".into(),
            input_size: 640,
            nms_threshold: 0.45,
            filter: DetectionFilterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.motion_window, 10);
        assert_eq!(config.stationary_threshold, 5.0);
        assert_eq!(config.warmup_frames, 30);
        assert_eq!(config.trail_capacity, 30);
        assert_eq!(config.trail_policy, TrailPolicy::Retain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        let short_window = PipelineConfig { motion_window: 1, ..Default::default() };
        assert!(matches!(short_window.validate(), Err(Error::InvalidConfig(_))));

        let nan_threshold = PipelineConfig { stationary_threshold: f64::NAN, ..Default::default() };
        assert!(nan_threshold.validate().is_err());

        let negative_threshold = PipelineConfig { stationary_threshold: -1.0, ..Default::default() };
        assert!(negative_threshold.validate().is_err());

        let no_trail = PipelineConfig { trail_capacity: 0, ..Default::default() };
        assert!(no_trail.validate().is_err());
    }
}
