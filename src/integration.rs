//! Integration module for connecting detection backends with the
//! trackers.
//!
//! This module provides the seams to the external collaborators: a trait
//! for detection sources, a builder for assembling detection records, and
//! a pipeline that runs detection and tracking per frame.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::{PipelineError, TrackerPipeline};
