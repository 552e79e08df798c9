//! Embedded appearance-matching tracker.
//!
//! This is the black box behind [`crate::tracker::AppearanceTracker`]:
//! detections carrying `(box, confidence, feature)` go in, confirmed
//! tracks each associated with at most one detection come out. Matching
//! runs appearance-first, cascaded by recency, with an IoU pass catching
//! what appearance could not.

mod deep_tracker;
mod kalman_filter;
mod nn_metric;

pub use deep_tracker::{DeepDetection, DeepTracker, Track};
pub use kalman_filter::KalmanFilter;
pub use nn_metric::NearestNeighborMetric;
