// THEORY:
// The `motion_window` module is the memory of the engine. Every frame, each tracked
// object's centroid is appended to that identity's history; nothing is ever evicted,
// so the full path of every object seen during the run stays available.
//
// Scoring never looks at the full path though. Consumers read a "recent window", a
// read-time slice of the last N centroids, and sum the distances between consecutive
// points. That path length is the discrete stand-in for how much an object moved
// recently.
//
// Storage is arena-style: identities map to a slot index in a dense `Vec`, and slots
// are handed out in first-sighting order. That order is also the iteration order,
// which keeps everything downstream deterministic for a fixed input sequence.

use crate::core_modules::geometry::{Centroid, Identity};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct IdentityHistory {
    identity: Identity,
    points: Vec<Centroid>,
}

/// Append-only centroid history for every identity seen so far.
#[derive(Debug, Clone, Default)]
pub struct MotionHistory {
    slots: HashMap<Identity, usize>,
    histories: Vec<IdentityHistory>,
}

impl MotionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a centroid to the identity's history, creating it on first sighting.
    pub fn record(&mut self, identity: Identity, centroid: Centroid) {
        let slot = match self.slots.get(&identity) {
            Some(&slot) => slot,
            None => {
                let slot = self.histories.len();
                self.histories.push(IdentityHistory { identity, points: Vec::new() });
                self.slots.insert(identity, slot);
                slot
            }
        };
        self.histories[slot].points.push(centroid);
    }

    /// The last `window_size` centroids of the identity, oldest first.
    ///
    /// Returns every point when fewer exist, and an empty slice for unknown identities.
    pub fn recent(&self, identity: Identity, window_size: usize) -> &[Centroid] {
        tail(self.full(identity), window_size)
    }

    /// The identity's complete history.
    pub fn full(&self, identity: Identity) -> &[Centroid] {
        self.slots
            .get(&identity)
            .map(|&slot| self.histories[slot].points.as_slice())
            .unwrap_or(&[])
    }

    /// Path length over the recent window, or `None` with fewer than two points.
    pub fn recent_motion(&self, identity: Identity, window_size: usize) -> Option<f64> {
        let recent = self.recent(identity, window_size);
        (recent.len() >= 2).then(|| path_length(recent))
    }

    /// Every identity with its full history, in first-sighting order.
    pub fn iter(&self) -> impl Iterator<Item = (Identity, &[Centroid])> {
        self.histories.iter().map(|h| (h.identity, h.points.as_slice()))
    }

    /// Whether the identity has ever been recorded. Inspection only; scoring never needs it.
    pub fn contains(&self, identity: Identity) -> bool {
        self.slots.contains_key(&identity)
    }

    /// Number of distinct identities recorded.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

fn tail(points: &[Centroid], window_size: usize) -> &[Centroid] {
    &points[points.len().saturating_sub(window_size)..]
}

/// Sum of Euclidean distances between consecutive points.
pub fn path_length(points: &[Centroid]) -> f64 {
    points.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Centroid {
        Centroid::new(x, y)
    }

    #[test]
    fn unknown_identity_has_empty_history() {
        let history = MotionHistory::new();
        assert!(history.recent(42, 10).is_empty());
        assert_eq!(history.recent_motion(42, 10), None);
        assert!(history.is_empty());
    }

    #[test]
    fn recent_returns_min_of_length_and_window() {
        let mut history = MotionHistory::new();
        for i in 0..25 {
            history.record(1, p(i as f64, 0.0));
            let expected = (i + 1).min(10);
            assert_eq!(history.recent(1, 10).len(), expected);
        }
        assert_eq!(history.full(1).len(), 25);
    }

    #[test]
    fn recent_preserves_order_and_keeps_newest() {
        let mut history = MotionHistory::new();
        for i in 0..12 {
            history.record(3, p(i as f64, 0.0));
        }
        let recent = history.recent(3, 10);
        assert_eq!(recent.first(), Some(&p(2.0, 0.0)));
        assert_eq!(recent.last(), Some(&p(11.0, 0.0)));
        assert!(recent.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn single_point_has_no_motion() {
        let mut history = MotionHistory::new();
        history.record(5, p(10.0, 10.0));
        assert_eq!(history.recent_motion(5, 10), None);
        history.record(5, p(13.0, 14.0));
        assert_eq!(history.recent_motion(5, 10), Some(5.0));
    }

    #[test]
    fn motion_ignores_points_older_than_the_window() {
        // One large jump at the very start, then ten motionless frames.
        let mut history = MotionHistory::new();
        history.record(9, p(0.0, 0.0));
        for _ in 0..10 {
            history.record(9, p(100.0, 0.0));
        }
        assert_eq!(history.full(9).len(), 11);
        assert_eq!(history.recent_motion(9, 10), Some(0.0));
    }

    #[test]
    fn iteration_follows_first_sighting() {
        let mut history = MotionHistory::new();
        history.record(30, p(0.0, 0.0));
        history.record(10, p(0.0, 0.0));
        history.record(30, p(1.0, 0.0));
        history.record(20, p(0.0, 0.0));
        let order: Vec<Identity> = history.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![30, 10, 20]);
        assert_eq!(history.len(), 3);
        assert!(history.contains(10));
    }

    #[test]
    fn path_length_sums_consecutive_distances() {
        let points = [p(0.0, 0.0), p(3.0, 4.0), p(3.0, 10.0)];
        assert_eq!(path_length(&points), 11.0);
        assert_eq!(path_length(&points[..1]), 0.0);
        assert_eq!(path_length(&[]), 0.0);
    }
}
