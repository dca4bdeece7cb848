// THEORY:
// The `role_classifier` turns raw motion history into meaning. It answers two
// questions for the current frame: which object is the ball in play, and which
// objects are just lying around.
//
// 1.  **Scoring**: every identity with at least two points in its recent window gets
//     a recent-motion score (path length over the window). Identities with fewer
//     points have no motion signal and are left out entirely.
// 2.  **Action**: the identity with the strictly largest score. Exact ties go to the
//     lowest identity value so the outcome never depends on hash order.
// 3.  **Stationary**: every other scored identity whose motion is strictly below the
//     stationary threshold.
// 4.  **Unclassified**: everything else, implicitly.
//
// A classification pass is a pure function of the history. It does not look at the
// previous assignment; the caller replaces the old one wholesale.

use crate::config::PipelineConfig;
use crate::core_modules::geometry::Identity;
use crate::core_modules::motion_window::MotionHistory;
use serde::Serialize;
use std::collections::BTreeSet;

/// The visual role of a single identity in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Action,
    Stationary,
    Unclassified,
}

/// The outcome of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleAssignment {
    pub action: Option<Identity>,
    pub stationary: BTreeSet<Identity>,
}

impl RoleAssignment {
    /// No roles at all; the state before the first classification.
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn role_of(&self, identity: Identity) -> Role {
        if self.action == Some(identity) {
            Role::Action
        } else if self.stationary.contains(&identity) {
            Role::Stationary
        } else {
            Role::Unclassified
        }
    }

    pub fn is_action(&self, identity: Identity) -> bool {
        self.action == Some(identity)
    }
}

/// Threshold-based classifier over recent motion.
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    window: usize,
    stationary_threshold: f64,
}

impl RoleClassifier {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            window: config.motion_window,
            stationary_threshold: config.stationary_threshold,
        }
    }

    /// Recent motion of every identity that has a motion signal, in first-sighting order.
    pub fn motion_scores(&self, history: &MotionHistory) -> Vec<(Identity, f64)> {
        history
            .iter()
            .filter_map(|(identity, _)| {
                history
                    .recent_motion(identity, self.window)
                    .map(|motion| (identity, motion))
            })
            .collect()
    }

    pub fn classify(&self, history: &MotionHistory) -> RoleAssignment {
        let scores = self.motion_scores(history);

        let mut action: Option<(Identity, f64)> = None;
        for &(identity, motion) in &scores {
            action = match action {
                Some((best_id, best)) if motion < best || (motion == best && best_id < identity) => {
                    Some((best_id, best))
                }
                _ => Some((identity, motion)),
            };
        }
        let action = action.map(|(identity, _)| identity);

        let stationary = scores
            .iter()
            .filter(|&&(identity, motion)| {
                Some(identity) != action && motion < self.stationary_threshold
            })
            .map(|&(identity, _)| identity)
            .collect();

        RoleAssignment { action, stationary }
    }
}
