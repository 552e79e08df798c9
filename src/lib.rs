//! Multi-target tracking for people in video.
//!
//! Three interchangeable trackers behind one [`MultiObjectTracker`]
//! contract:
//! - [`CentroidTracker`]: frame-to-frame nearest-point carry-over, no
//!   persistent motion state.
//! - [`SortTracker`]: constant-velocity Kalman prediction with IoU
//!   association.
//! - [`AppearanceTracker`]: Kalman motion plus an appearance-embedding
//!   gallery with cascaded matching.
//!
//! Detection models, re-identification and visualization live outside
//! this crate; see the [`integration`] module for the seams.

pub mod integration;
pub mod tracker;

pub use tracker::{
    AppearanceConfig, AppearanceTracker, CentroidConfig, CentroidTracker, Detection, IdentityTag,
    MultiObjectTracker, Rect, SortConfig, SortTracker, TrackError, TrackState,
};
