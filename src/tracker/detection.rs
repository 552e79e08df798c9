//! Per-frame detection record shared by all trackers.

use serde::{Deserialize, Serialize};

use crate::tracker::error::TrackError;
use crate::tracker::rect::Rect;

/// An identity label produced by an external re-identification stage
/// (face or whole-body embedding classifier). Carried opaquely: the
/// trackers move tags between frames but never interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityTag {
    pub label: String,
    pub confidence: f32,
}

impl IdentityTag {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A single observed entity in one frame.
///
/// Only `rect` and `confidence` are required. Every other attribute is an
/// explicit `Option`, so presence is checked at compile time instead of by
/// probing attributes at runtime. A record missing an optional attribute a
/// tracker needs (e.g. the representative point for the centroid tracker)
/// is excluded from association for that frame, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box (stored as TLWH, see [`Rect`] for conversions)
    pub rect: Rect,
    /// Detection confidence score
    pub confidence: f32,
    /// Representative point for nearest-point association, integer pixels
    pub point: Option<(i32, i32)>,
    /// Appearance embedding for the appearance-based tracker
    pub feature: Option<Vec<f32>>,
    /// Face identity from the external ReID stage
    pub face_id: Option<IdentityTag>,
    /// Whole-body identity from the external ReID stage
    pub deep_id: Option<IdentityTag>,
    /// Opaque caller payload, carried verbatim across frames
    pub misc: Option<serde_json::Value>,
    /// Track id, assigned by a tracker; `None` on input
    pub id: Option<u64>,
}

impl Detection {
    /// Create a detection from a TLBR box (x1, y1, x2, y2) and a score.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), confidence)
    }

    pub fn from_rect(rect: Rect, confidence: f32) -> Self {
        Self {
            rect,
            confidence,
            point: None,
            feature: None,
            face_id: None,
            deep_id: None,
            misc: None,
            id: None,
        }
    }

    /// Box corners as integer pixel coordinates (x1, y1, x2, y2).
    pub fn box_xyxy(&self) -> [i32; 4] {
        let [x1, y1, x2, y2] = self.rect.to_tlbr();
        [
            x1.round() as i32,
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
        ]
    }

    /// Box as integer pixel coordinates (x, y, width, height).
    pub fn box_xywh(&self) -> [i32; 4] {
        let [x, y, w, h] = self.rect.to_tlwh();
        [
            x.round() as i32,
            y.round() as i32,
            w.round() as i32,
            h.round() as i32,
        ]
    }

    /// Copy the identity tags of `other` into unset slots of this record.
    ///
    /// A tag already present on `self` wins; the fresher observation takes
    /// precedence over carried history.
    pub(crate) fn inherit_tags_from(&mut self, face: &Option<IdentityTag>, deep: &Option<IdentityTag>) {
        if self.face_id.is_none() {
            self.face_id = face.clone();
        }
        if self.deep_id.is_none() {
            self.deep_id = deep.clone();
        }
    }
}

/// Validate an input batch before any tracker state is touched.
///
/// This is the shared fail-fast contract of all three trackers: a
/// malformed record (non-finite geometry or confidence, inverted box)
/// aborts the whole update with a descriptive error and no partial
/// mutation.
pub fn validate_detections(detections: &[Detection]) -> Result<(), TrackError> {
    for (index, det) in detections.iter().enumerate() {
        if !det.rect.is_finite() {
            return Err(TrackError::MalformedDetection {
                index,
                reason: "bounding box has non-finite coordinates".into(),
            });
        }
        if det.rect.width < 0.0 || det.rect.height < 0.0 {
            return Err(TrackError::MalformedDetection {
                index,
                reason: "bounding box has negative extent".into(),
            });
        }
        if !det.confidence.is_finite() {
            return Err(TrackError::MalformedDetection {
                index,
                reason: "confidence is not finite".into(),
            });
        }
        if let Some(feature) = &det.feature {
            if feature.iter().any(|v| !v.is_finite()) {
                return Err(TrackError::MalformedDetection {
                    index,
                    reason: "appearance feature contains non-finite values".into(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_accessors() {
        let det = Detection::new(10.2, 20.0, 40.8, 60.0, 0.9);
        assert_eq!(det.box_xyxy(), [10, 20, 41, 60]);
        assert_eq!(det.box_xywh(), [10, 20, 31, 40]);
    }

    #[test]
    fn test_validate_rejects_nan_box() {
        let det = Detection::new(f32::NAN, 0.0, 10.0, 10.0, 0.9);
        assert!(validate_detections(&[det]).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_box() {
        let det = Detection::new(10.0, 10.0, 0.0, 0.0, 0.9);
        assert!(validate_detections(&[det]).is_err());
    }

    #[test]
    fn test_validate_accepts_missing_optionals() {
        let det = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9);
        assert!(validate_detections(&[det]).is_ok());
    }
}
