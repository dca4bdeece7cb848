// THEORY:
// The `tracker` module defines the seams to the two external collaborators of the
// engine, the `Detector` and the `Tracker`, and ships a reference tracker so the
// pipeline can run end to end.
//
// The core only relies on the tracker's contract: identities are stable for the same
// physical object, may appear at any time, and may vanish without notice. How the
// identities are produced is the tracker's business.
//
// The reference `IouTracker` solves the data association problem in the SORT manner:
// 1.  **Prediction**: each live track extrapolates its box with a constant velocity
//     estimated from its last two matched boxes, advanced once per frame since it was
//     last matched so an occluded ball is looked for where it should be now.
// 2.  **Association**: detections are matched to predicted boxes greedily, best IoU
//     first, as long as the IoU reaches the threshold.
// 3.  **Lifecycle**: unmatched detections are born as new tracks, unmatched tracks age,
//     and tracks unseen for more than `max_age` frames die.
// 4.  **Confirmation**: only tracks matched in the current frame with a long enough
//     hit streak are reported, except during the tracker's own first frames.

use crate::config::TrackerConfig;
use crate::core_modules::geometry::{BoundingBox, Detection, Identity, Track};
use tracing::debug;

/// Produces candidate boxes for a frame of type `F`.
pub trait Detector<F: ?Sized> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

/// Assigns stable identities to per-frame detections.
pub trait Tracker {
    fn update(&mut self, detections: &[Detection]) -> Vec<Track>;
}

/// A live object inside the reference tracker.
#[derive(Debug, Clone)]
struct TrackedBall {
    identity: Identity,
    bbox: BoundingBox,
    /// Per-frame shift of the box's top-left and bottom-right corners.
    velocity: (f64, f64, f64, f64),
    hits: u32,
    hit_streak: u32,
    frames_since_seen: u32,
}

impl TrackedBall {
    fn new(identity: Identity, bbox: BoundingBox) -> Self {
        Self {
            identity,
            bbox,
            velocity: (0.0, 0.0, 0.0, 0.0),
            hits: 1,
            hit_streak: 0,
            frames_since_seen: 0,
        }
    }

    /// Where the box should be this frame, one velocity step per frame since the last match.
    fn predict(&self) -> BoundingBox {
        let steps = (self.frames_since_seen + 1) as f64;
        let (vx1, vy1, vx2, vy2) = self.velocity;
        BoundingBox::new(
            self.bbox.x1 + vx1 * steps,
            self.bbox.y1 + vy1 * steps,
            self.bbox.x2 + vx2 * steps,
            self.bbox.y2 + vy2 * steps,
        )
    }

    fn update(&mut self, bbox: BoundingBox) {
        // Velocity is averaged over the frames the object was missing.
        let steps = (self.frames_since_seen + 1) as f64;
        self.velocity = (
            (bbox.x1 - self.bbox.x1) / steps,
            (bbox.y1 - self.bbox.y1) / steps,
            (bbox.x2 - self.bbox.x2) / steps,
            (bbox.y2 - self.bbox.y2) / steps,
        );
        self.bbox = bbox;
        self.hits += 1;
        self.hit_streak += 1;
        self.frames_since_seen = 0;
    }
}

/// Greedy IoU tracker with constant-velocity prediction.
pub struct IouTracker {
    config: TrackerConfig,
    tracks: Vec<TrackedBall>,
    next_id: Identity,
    frame_count: u64,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
            frame_count: 0,
        }
    }

    /// Number of live tracks, reported or not, for logs and inspection.
    pub fn active_count(&self) -> usize {
        self.tracks.len()
    }

    fn match_detections(&self, predicted: &[BoundingBox], detections: &[Detection]) -> Vec<(usize, usize)> {
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for (ti, bbox) in predicted.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let iou = bbox.iou(&det.bbox);
                if iou >= self.config.iou_threshold {
                    candidates.push((ti, di, iou));
                }
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut used_tracks = vec![false; predicted.len()];
        let mut used_dets = vec![false; detections.len()];
        let mut matches = Vec::new();
        for (ti, di, _) in candidates {
            if used_tracks[ti] || used_dets[di] {
                continue;
            }
            used_tracks[ti] = true;
            used_dets[di] = true;
            matches.push((ti, di));
        }
        matches
    }
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Tracker for IouTracker {
    fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        self.frame_count += 1;

        // --- 1. Prediction & matching ---
        let predicted: Vec<BoundingBox> = self.tracks.iter().map(TrackedBall::predict).collect();
        let matches = self.match_detections(&predicted, detections);

        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];
        for &(ti, di) in &matches {
            self.tracks[ti].update(detections[di].bbox);
            matched_tracks[ti] = true;
            matched_dets[di] = true;
        }

        // --- 2. Aging ---
        for (track, matched) in self.tracks.iter_mut().zip(&matched_tracks) {
            if !matched {
                track.frames_since_seen += 1;
                track.hit_streak = 0;
            }
        }

        // --- 3. Birth ---
        for (det, matched) in detections.iter().zip(&matched_dets) {
            if !matched {
                self.tracks.push(TrackedBall::new(self.next_id, det.bbox));
                self.next_id += 1;
            }
        }

        // --- 4. Death ---
        let max_age = self.config.max_age;
        self.tracks.retain(|track| {
            let alive = track.frames_since_seen <= max_age;
            if !alive {
                debug!(identity = track.identity, hits = track.hits, "track expired");
            }
            alive
        });

        let warming_up = self.frame_count <= self.config.min_hits as u64;
        self.tracks
            .iter()
            .filter(|t| t.frames_since_seen == 0 && (t.hit_streak >= self.config.min_hits || warming_up))
            .map(|t| Track::new(t.bbox, t.identity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f64, y: f64) -> Detection {
        Detection::new(BoundingBox::new(x, y, x + 20.0, y + 20.0), 0.9)
    }

    #[test]
    fn keeps_identity_for_a_moving_ball() {
        let mut tracker = IouTracker::default();
        let mut ids = Vec::new();
        for i in 0..10 {
            let tracks = tracker.update(&[det(i as f64 * 4.0, 50.0)]);
            assert_eq!(tracks.len(), 1);
            ids.push(tracks[0].identity);
        }
        assert!(ids.iter().all(|&id| id == 1));
    }

    #[test]
    fn separate_balls_get_separate_identities() {
        let mut tracker = IouTracker::default();
        let tracks = tracker.update(&[det(0.0, 0.0), det(200.0, 200.0)]);
        let mut ids: Vec<Identity> = tracks.iter().map(|t| t.identity).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn late_arrivals_need_min_hits_before_reporting() {
        let mut tracker = IouTracker::default();
        for _ in 0..5 {
            tracker.update(&[det(0.0, 0.0)]);
        }

        // A second ball appears after the tracker's own warm-up.
        let mut seen = Vec::new();
        for _ in 0..4 {
            let tracks = tracker.update(&[det(0.0, 0.0), det(300.0, 300.0)]);
            seen.push(tracks.iter().any(|t| t.identity == 2));
        }
        assert_eq!(seen, vec![false, false, false, true]);
    }

    #[test]
    fn empty_frames_are_accepted_and_tracks_expire() {
        let config = TrackerConfig { max_age: 2, ..Default::default() };
        let mut tracker = IouTracker::new(config);
        tracker.update(&[det(0.0, 0.0)]);
        assert_eq!(tracker.active_count(), 1);

        for _ in 0..2 {
            assert!(tracker.update(&[]).is_empty());
        }
        assert_eq!(tracker.active_count(), 1);
        tracker.update(&[]);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn unmatched_tracks_are_not_reported() {
        let mut tracker = IouTracker::default();
        tracker.update(&[det(0.0, 0.0), det(100.0, 0.0)]);
        let tracks = tracker.update(&[det(0.0, 0.0)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].identity, 1);
    }

    #[test]
    fn occluded_ball_keeps_its_identity() {
        let mut tracker = IouTracker::default();
        for i in 0..5 {
            tracker.update(&[det(i as f64 * 10.0, 50.0)]);
        }
        // Two frames hidden; x = 50 and 60 go unseen.
        tracker.update(&[]);
        tracker.update(&[]);

        tracker.update(&[det(70.0, 50.0)]);
        assert_eq!(tracker.active_count(), 1);

        tracker.update(&[det(80.0, 50.0)]);
        let tracks = tracker.update(&[det(90.0, 50.0)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].identity, 1);
    }
}
