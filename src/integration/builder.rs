//! Builder for creating Detection objects from various input formats.

use crate::tracker::{Detection, IdentityTag, Rect};

/// Builder for creating [`Detection`] records from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    rect: Rect,
    confidence: f32,
    point: Option<(i32, i32)>,
    feature: Option<Vec<f32>>,
    face_id: Option<IdentityTag>,
    deep_id: Option<IdentityTag>,
    misc: Option<serde_json::Value>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in XYXY format (x1, y1, x2, y2).
    pub fn xyxy(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.rect = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (top-left x, top-left y, width, height).
    pub fn xywh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.rect = Rect::new(x, y, w, h);
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the representative point used by nearest-point association.
    pub fn point(mut self, x: i32, y: i32) -> Self {
        self.point = Some((x, y));
        self
    }

    /// Attach an appearance embedding.
    pub fn feature(mut self, feature: Vec<f32>) -> Self {
        self.feature = Some(feature);
        self
    }

    /// Attach a face identity tag.
    pub fn face_id(mut self, label: impl Into<String>, confidence: f32) -> Self {
        self.face_id = Some(IdentityTag::new(label, confidence));
        self
    }

    /// Attach a body identity tag.
    pub fn deep_id(mut self, label: impl Into<String>, confidence: f32) -> Self {
        self.deep_id = Some(IdentityTag::new(label, confidence));
        self
    }

    /// Attach an opaque payload carried verbatim across frames.
    pub fn misc(mut self, misc: serde_json::Value) -> Self {
        self.misc = Some(misc);
        self
    }

    /// Build the final [`Detection`].
    pub fn build(self) -> Detection {
        let mut det = Detection::from_rect(self.rect, self.confidence);
        det.point = self.point;
        det.feature = self.feature;
        det.face_id = self.face_id;
        det.deep_id = self.deep_id;
        det.misc = self.misc;
        det
    }
}
