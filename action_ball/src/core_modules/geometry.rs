// THEORY:
// The `geometry` module holds the plain value types that flow between the external
// collaborators (detector, tracker) and the role-classification core. None of these
// types carry behavior beyond simple derived quantities; they exist so that every
// stage speaks the same vocabulary of boxes, centers and identities.
//
// Coordinates are image pixels stored as `f64`. The tracker is trusted for identity
// but not for numeric hygiene: `Track::sanitize` is the single place where malformed
// boxes are caught before they can reach the motion history.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stable tracker-assigned key for one physical object.
pub type Identity = u64;

/// An axis-aligned box given by its top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// The geometric center of the box.
    pub fn centroid(&self) -> Centroid {
        Centroid::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Intersection over union. Zero for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// A 2D point in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Centroid) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A detector candidate: a box and its confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self { bbox, confidence }
    }
}

/// A tracker output: a box plus the identity of the object it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub bbox: BoundingBox,
    pub identity: Identity,
}

/// Why a tracker output was dropped for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TrackRejection {
    #[error("track {identity} has non-finite coordinates")]
    NonFinite { identity: Identity },
    #[error("track {identity} has an inverted box ({width:.1} x {height:.1})")]
    Inverted { identity: Identity, width: f64, height: f64 },
}

impl Track {
    pub fn new(bbox: BoundingBox, identity: Identity) -> Self {
        Self { bbox, identity }
    }

    pub fn centroid(&self) -> Centroid {
        self.bbox.centroid()
    }

    /// Validates the box before it is recorded.
    ///
    /// Non-finite or inverted boxes are rejected. Negative coordinates are kept:
    /// an object partly outside the frame still has a meaningful center.
    pub fn sanitize(self) -> Result<Track, TrackRejection> {
        let b = self.bbox;
        if ![b.x1, b.y1, b.x2, b.y2].iter().all(|v| v.is_finite()) {
            return Err(TrackRejection::NonFinite { identity: self.identity });
        }
        if b.x2 < b.x1 || b.y2 < b.y1 {
            return Err(TrackRejection::Inverted {
                identity: self.identity,
                width: b.width(),
                height: b.height(),
            });
        }
        Ok(self)
    }
}

/// A straight line between two consecutive trail points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Centroid,
    pub to: Centroid,
}
