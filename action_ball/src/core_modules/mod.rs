pub mod detection_filter;
pub mod frame_annotator;
pub mod geometry;
pub mod motion_window;
pub mod role_classifier;
pub mod trail_buffer;
pub mod tracker;
pub mod utils;
