// THEORY:
// The `pipeline` module is the top-level API of the engine. It owns every piece of
// temporal state (motion history, current roles, trails) and threads it through the
// stages in a fixed order for each frame:
//
//     detect -> track -> record -> classify -> trail update -> annotate
//
// It is a two-state machine. During `Warmup` tracks are only recorded; once more
// than `warmup_frames` frames have been seen it switches to `Classifying` for good,
// and every later frame is classified from scratch. Processing is strictly
// sequential: a frame is finished before the next one starts.

use crate::config::PipelineConfig;
use crate::core_modules::frame_annotator::{self, Canvas};
use crate::core_modules::geometry::{Segment, Track};
use crate::core_modules::motion_window::MotionHistory;
use crate::core_modules::role_classifier::RoleClassifier;
use crate::core_modules::trail_buffer::TrailBuffer;
use crate::core_modules::tracker::{Detector, Tracker};
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::role_classifier::{Role, RoleAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Warmup,
    Classifying,
}

/// Everything the pipeline decided about one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// 1-based index of the frame.
    pub frame_number: u64,
    pub state: PipelineState,
    /// The tracks that passed sanitisation, in tracker order.
    pub tracks: Vec<Track>,
    pub roles: RoleAssignment,
    /// Trail of the action identity, present only when it was tracked this frame.
    pub trail: Vec<Segment>,
    pub rejected_tracks: usize,
}

pub struct BallPipeline {
    config: PipelineConfig,
    classifier: RoleClassifier,
    history: MotionHistory,
    trails: TrailBuffer,
    roles: RoleAssignment,
    frame_count: u64,
}

impl BallPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: RoleClassifier::new(&config),
            trails: TrailBuffer::new(&config),
            history: MotionHistory::new(),
            roles: RoleAssignment::unassigned(),
            frame_count: 0,
            config,
        })
    }

    pub fn state(&self) -> PipelineState {
        if self.frame_count > self.config.warmup_frames {
            PipelineState::Classifying
        } else {
            PipelineState::Warmup
        }
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }

    pub fn trails(&self) -> &TrailBuffer {
        &self.trails
    }

    /// The role assignment of the last processed frame.
    pub fn roles(&self) -> &RoleAssignment {
        &self.roles
    }

    /// Runs the core step for one frame of tracker output: record, classify, update trails.
    ///
    /// Malformed tracks are skipped for this frame only.
    pub fn process_tracks(&mut self, tracks: Vec<Track>) -> FrameReport {
        let previous_state = self.state();
        self.frame_count += 1;
        let state = self.state();
        if state != previous_state {
            info!(frame = self.frame_count, identities = self.history.len(), "warm-up complete, classifying roles");
        }

        let mut accepted = Vec::with_capacity(tracks.len());
        let mut rejected_tracks = 0;
        for track in tracks {
            match track.sanitize() {
                Ok(track) => accepted.push(track),
                Err(reason) => {
                    rejected_tracks += 1;
                    warn!(frame = self.frame_count, %reason, "skipping malformed track");
                }
            }
        }

        for track in &accepted {
            self.history.record(track.identity, track.centroid());
        }

        let mut trail = Vec::new();
        if state == PipelineState::Classifying {
            let roles = self.classifier.classify(&self.history);
            if roles.action != self.roles.action {
                info!(frame = self.frame_count, from = ?self.roles.action, to = ?roles.action, "action role changed");
            }
            self.trails.observe_action(roles.action);

            for track in &accepted {
                self.trails.append_if_action(track.identity, track.centroid(), roles.is_action(track.identity));
            }
            if let Some(action) = roles.action {
                if accepted.iter().any(|t| t.identity == action) {
                    trail = self.trails.render_segments(action);
                }
            }
            self.roles = roles;
        }

        debug!(
            frame = self.frame_count,
            tracks = accepted.len(),
            action = ?self.roles.action,
            stationary = self.roles.stationary.len(),
            trails = self.trails.trail_count(),
            "frame processed"
        );

        FrameReport {
            frame_number: self.frame_count,
            state,
            tracks: accepted,
            roles: self.roles.clone(),
            trail,
            rejected_tracks,
        }
    }

    /// Runs the whole per-frame chain on `frame`, annotating it in place.
    pub fn process_frame<F, D, T>(&mut self, frame: &mut F, detector: &mut D, tracker: &mut T) -> Result<FrameReport>
    where
        F: Canvas,
        D: Detector<F>,
        T: Tracker,
    {
        let frame_number = self.frame_count + 1;
        let detections = detector.detect(frame).map_err(|e| Error::Detector {
            frame: frame_number,
            source: Box::new(e),
        })?;
        let tracks = tracker.update(&detections);
        let report = self.process_tracks(tracks);

        frame_annotator::annotate(frame, &report.tracks, &report.roles, &report.trail).map_err(|e| {
            Error::Annotate {
                frame: report.frame_number,
                source: Box::new(e),
            }
        })?;
        Ok(report)
    }
}
