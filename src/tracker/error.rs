use thiserror::Error;

/// Errors surfaced by the trackers.
///
/// Input validation runs before any internal state mutation, so a failed
/// `update` leaves the tracker exactly as it was.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("detection {index} is malformed: {reason}")]
    MalformedDetection { index: usize, reason: String },
}
