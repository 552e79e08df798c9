//! TrackerPipeline for combining detection with tracking.

use thiserror::Error;

use crate::tracker::{Detection, MultiObjectTracker, TrackError};

use super::DetectionSource;

/// Either stage of the pipeline can fail: inference in the backend, or
/// input validation in the tracker.
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("detection failed: {0}")]
    Detector(E),
    #[error(transparent)]
    Tracker(#[from] TrackError),
}

/// A combined pipeline bundling a detection backend with any of the
/// trackers.
///
/// This struct provides a convenient way to run end-to-end tracking by
/// combining any [`DetectionSource`] with any [`MultiObjectTracker`].
pub struct TrackerPipeline<D: DetectionSource, T: MultiObjectTracker> {
    detector: D,
    tracker: T,
}

impl<D: DetectionSource, T: MultiObjectTracker> TrackerPipeline<D, T> {
    /// Create a new tracking pipeline from a detector and a tracker.
    pub fn new(detector: D, tracker: T) -> Self {
        Self { detector, tracker }
    }

    /// Process a single frame and return the annotated records.
    ///
    /// Runs detection on the input image, then updates the tracker with
    /// the detected objects.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, PipelineError<D::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detector)?;
        Ok(self.tracker.update(detections)?)
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }
}
