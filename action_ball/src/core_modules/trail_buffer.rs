// THEORY:
// The `trail_buffer` keeps the short visual tail drawn behind the action ball. It is
// purely a rendering aid: no classification decision ever reads it.
//
// Each identity gets a bounded ring of its most recent centroids, created lazily the
// first time the identity holds the action role. Points are only appended while the
// identity is the action object. When the role moves on, the old trail is frozen by
// default (kept in memory, never drawn); `TrailPolicy::ClearOnRoleLoss` drops it
// instead so a returning identity starts from scratch.

use crate::config::{PipelineConfig, TrailPolicy};
use crate::core_modules::geometry::{Centroid, Identity, Segment};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TrailBuffer {
    capacity: usize,
    policy: TrailPolicy,
    trails: HashMap<Identity, VecDeque<Centroid>>,
    holder: Option<Identity>,
}

impl TrailBuffer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            capacity: config.trail_capacity,
            policy: config.trail_policy,
            trails: HashMap::new(),
            holder: None,
        }
    }

    /// Appends the centroid when `is_action` holds, evicting the oldest points beyond capacity.
    pub fn append_if_action(&mut self, identity: Identity, centroid: Centroid, is_action: bool) {
        if !is_action {
            return;
        }
        let trail = self
            .trails
            .entry(identity)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        trail.push_back(centroid);
        while trail.len() > self.capacity {
            trail.pop_front();
        }
    }

    /// Notes the current action identity, applying the trail policy to the previous holder.
    pub fn observe_action(&mut self, action: Option<Identity>) {
        if self.holder == action {
            return;
        }
        if let Some(previous) = self.holder {
            if self.policy == TrailPolicy::ClearOnRoleLoss && self.trails.remove(&previous).is_some() {
                debug!(identity = previous, "cleared trail after role loss");
            }
        }
        self.holder = action;
    }

    /// Line segments joining consecutive trail points, oldest first.
    pub fn render_segments(&self, identity: Identity) -> Vec<Segment> {
        self.trails
            .get(&identity)
            .map(|trail| {
                trail
                    .iter()
                    .zip(trail.iter().skip(1))
                    .map(|(&from, &to)| Segment { from, to })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn trail(&self, identity: Identity) -> Option<&VecDeque<Centroid>> {
        self.trails.get(&identity)
    }

    pub fn len(&self, identity: Identity) -> usize {
        self.trails.get(&identity).map_or(0, VecDeque::len)
    }

    /// Number of identities that currently own a trail, for logs and inspection.
    pub fn trail_count(&self) -> usize {
        self.trails.len()
    }
}
