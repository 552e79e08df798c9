//! Appearance-based tracker: adapter over the embedded deep tracker.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::tracker::MultiObjectTracker;
use crate::tracker::assignment::{nearest_box, suppress_overlaps};
use crate::tracker::deep::{DeepDetection, DeepTracker};
use crate::tracker::detection::{Detection, IdentityTag, validate_detections};
use crate::tracker::error::TrackError;
use crate::tracker::rect::Rect;

/// Configuration for [`AppearanceTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceConfig {
    /// Gating threshold on the cosine distance to a track's gallery
    pub max_cosine_distance: f32,
    /// Bound on each track's feature gallery; `None` keeps everything
    pub nn_budget: Option<usize>,
    /// Maximum box overlap surviving the pre-tracking suppression
    pub nms_max_overlap: f32,
    /// IoU gate of the embedded tracker's fallback association
    pub max_iou_distance: f32,
    /// Misses before a confirmed embedded track is deleted
    pub max_age: u32,
    /// Hits before an embedded track is confirmed
    pub n_init: u32,
    /// Corner spread accepted when re-attaching tracker output to the
    /// caller's detection list
    pub reconcile_spread: f32,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            max_cosine_distance: 0.2,
            nn_budget: Some(100),
            nms_max_overlap: 1.0,
            max_iou_distance: 0.7,
            max_age: 30,
            n_init: 3,
            reconcile_spread: 5.0,
        }
    }
}

/// Minimum survival age before identity tags are propagated onto a
/// record; keeps noisy early identifications off just-born tracks.
const TAG_MIN_AGE: u32 = 3;

#[derive(Debug, Clone, Default)]
struct TrackIdentity {
    face_id: Option<IdentityTag>,
    deep_id: Option<IdentityTag>,
}

/// Motion + appearance tracker.
///
/// Responsibilities live in the adapter layer: suppress overlapping
/// candidates, feed detections with features to the embedded
/// [`DeepTracker`], then re-attach the caller's records to the emitted
/// tracks by nearest box and carry identity tags across frames.
pub struct AppearanceTracker {
    config: AppearanceConfig,
    deep: DeepTracker,
    identities: HashMap<u64, TrackIdentity>,
}

impl AppearanceTracker {
    pub fn new(config: AppearanceConfig) -> Self {
        let deep = DeepTracker::new(
            config.max_cosine_distance,
            config.nn_budget,
            config.max_iou_distance,
            config.max_age,
            config.n_init,
        );
        Self {
            config,
            deep,
            identities: HashMap::new(),
        }
    }

    /// The embedded tracker, for inspection.
    pub fn deep(&self) -> &DeepTracker {
        &self.deep
    }
}

impl Default for AppearanceTracker {
    fn default() -> Self {
        Self::new(AppearanceConfig::default())
    }
}

impl MultiObjectTracker for AppearanceTracker {
    fn update(&mut self, detections: Vec<Detection>) -> Result<Vec<Detection>, TrackError> {
        validate_detections(&detections)?;

        let mut records = detections;
        for record in &mut records {
            record.id = None;
        }

        // Only records carrying an appearance feature can associate.
        let candidates: Vec<usize> = records
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.feature.as_ref().map(|_| i))
            .collect();

        let boxes: Vec<Rect> = candidates.iter().map(|&i| records[i].rect).collect();
        let confidences: Vec<f32> = candidates.iter().map(|&i| records[i].confidence).collect();
        let kept = suppress_overlaps(&boxes, &confidences, self.config.nms_max_overlap);

        let deep_detections: Vec<DeepDetection> = kept
            .iter()
            .map(|&k| {
                let record = &records[candidates[k]];
                DeepDetection {
                    rect: record.rect,
                    confidence: record.confidence,
                    feature: record.feature.clone().unwrap_or_default(),
                }
            })
            .collect();

        self.deep.predict();
        self.deep.update(&deep_detections);

        let det_rects: Vec<Rect> = records.iter().map(|d| d.rect).collect();
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut active_ids: HashSet<u64> = HashSet::new();

        for track in self.deep.tracks() {
            active_ids.insert(track.id);
            if !track.is_confirmed() || track.time_since_update >= 1 {
                continue;
            }
            let Some(det_idx) =
                nearest_box(&track.rect(), &det_rects, self.config.reconcile_spread)
            else {
                continue;
            };
            if !claimed.insert(det_idx) {
                continue;
            }

            let record = &mut records[det_idx];
            record.id = Some(track.id);

            let identity = self.identities.entry(track.id).or_default();
            if track.age > TAG_MIN_AGE {
                record.inherit_tags_from(&identity.face_id, &identity.deep_id);
            }
            if record.face_id.is_some() {
                identity.face_id = record.face_id.clone();
            }
            if record.deep_id.is_some() {
                identity.deep_id = record.deep_id.clone();
            }
        }

        self.identities.retain(|id, _| active_ids.contains(id));

        Ok(records)
    }
}
