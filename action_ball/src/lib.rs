// THEORY:
// This file is the entry point for the `action_ball` library crate. It exposes the
// `BallPipeline`, which turns per-frame tracker output into role labels (action ball,
// stationary ball, unclassified) and a bounded trail behind the action ball, along
// with the configuration, error types and drawing seam that go with it.
//
// Detection, identity association and video I/O stay outside the crate. They are
// reached only through the `Detector`, `Tracker` and `Canvas` traits, so the
// classification core can be driven by any backend.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::{DetectionFilterConfig, DetectorConfig, PipelineConfig, TrackerConfig, TrailPolicy};
pub use error::{Error, Result};
pub use pipeline::{BallPipeline, FrameReport, PipelineState};
