// Acceptance rules for raw detector candidates: only ball-like classes with enough
// confidence and a box large enough to be a real ball rather than noise.

use crate::config::DetectionFilterConfig;
use crate::core_modules::geometry::Detection;

#[derive(Debug, Clone)]
pub struct DetectionFilter {
    config: DetectionFilterConfig,
}

impl DetectionFilter {
    pub fn new(config: DetectionFilterConfig) -> Self {
        Self { config }
    }

    /// All comparisons are strict: a candidate exactly at a limit is dropped.
    pub fn accept(&self, label: &str, detection: &Detection) -> bool {
        self.config.labels.iter().any(|l| l == label)
            && detection.confidence > self.config.min_confidence
            && detection.bbox.width() > self.config.min_width
            && detection.bbox.height() > self.config.min_height
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(DetectionFilterConfig::default())
    }
}
