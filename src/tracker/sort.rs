//! Motion-only tracker: Kalman prediction + IoU association, after SORT.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tracker::MultiObjectTracker;
use crate::tracker::assignment::{iou_cost, linear_assignment, nearest_box};
use crate::tracker::detection::{Detection, validate_detections};
use crate::tracker::error::TrackError;
use crate::tracker::kalman_box::{
    DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE, KalmanBoxTrack,
};
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Configuration for [`SortTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// Frames a track may go unmatched before it is purged
    pub max_age: u32,
    /// Consecutive hits required before a track is emitted
    pub min_hits: u32,
    /// Minimum IoU for a valid detection/track pair
    pub iou_threshold: f32,
    /// Corner spread accepted when re-attaching tracker output to the
    /// caller's detection list
    pub reconcile_spread: f32,
    /// Measurement noise diagonal (x, y, s, r)
    pub measurement_noise: [f64; 4],
    /// Process noise diagonal (x, y, s, r, vx, vy, vs)
    pub process_noise: [f64; 7],
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_age: 1,
            min_hits: 3,
            iou_threshold: 0.3,
            reconcile_spread: 5.0,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            process_noise: DEFAULT_PROCESS_NOISE,
        }
    }
}

/// Kalman + IoU multi-object tracker.
///
/// Per frame: predict all live tracks, associate by IoU under the
/// `iou_threshold` gate, update matched tracks, spawn tracks from
/// unmatched detections, purge tracks older than `max_age`, and finally
/// reconcile confirmed tracks back onto the caller's records by nearest
/// box.
pub struct SortTracker {
    config: SortConfig,
    tracks: Vec<KalmanBoxTrack>,
    frame_count: u64,
    next_id: u64,
}

impl SortTracker {
    pub fn new(config: SortConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            frame_count: 0,
            next_id: 1,
        }
    }

    /// Live tracks, in creation order.
    pub fn tracks(&self) -> &[KalmanBoxTrack] {
        &self.tracks
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn spawn_track(&mut self, det: &Detection) {
        let mut track = KalmanBoxTrack::new(
            self.next_id,
            det.rect,
            self.config.measurement_noise,
            self.config.process_noise,
        );
        track.face_id = det.face_id.clone();
        track.deep_id = det.deep_id.clone();
        debug!("track {} born at {:?}", track.id, det.rect);
        self.next_id += 1;
        self.tracks.push(track);
    }
}

impl Default for SortTracker {
    fn default() -> Self {
        Self::new(SortConfig::default())
    }
}

impl MultiObjectTracker for SortTracker {
    fn update(&mut self, detections: Vec<Detection>) -> Result<Vec<Detection>, TrackError> {
        validate_detections(&detections)?;

        self.frame_count += 1;

        let mut records = detections;
        for record in &mut records {
            record.id = None;
        }

        // Predict every live track; a filter gone non-finite is dead and
        // must not leak NaN into the cost matrix.
        let mut predicted: Vec<Rect> = Vec::with_capacity(self.tracks.len());
        let mut live: Vec<KalmanBoxTrack> = Vec::with_capacity(self.tracks.len());
        for mut track in self.tracks.drain(..) {
            let rect = track.predict();
            if rect.is_finite() {
                predicted.push(rect);
                live.push(track);
            } else {
                debug!("track {} dropped on non-finite prediction", track.id);
            }
        }
        self.tracks = live;

        let det_rects: Vec<Rect> = records.iter().map(|d| d.rect).collect();
        let cost = iou_cost(&det_rects, &predicted);
        let result = linear_assignment(&cost, 1.0 - self.config.iou_threshold);

        for &(det_idx, track_idx) in &result.matches {
            let det = &records[det_idx];
            let track = &mut self.tracks[track_idx];
            track.update(det.rect);
            if det.face_id.is_some() {
                track.face_id = det.face_id.clone();
            }
            if det.deep_id.is_some() {
                track.deep_id = det.deep_id.clone();
            }
            track.promote(self.config.min_hits, self.frame_count);
        }

        for &det_idx in &result.unmatched_detections {
            let det = records[det_idx].clone();
            self.spawn_track(&det);
        }

        for track in &mut self.tracks {
            if track.time_since_update > self.config.max_age {
                track.state = TrackState::Deleted;
                debug!("track {} expired after {} missed frames", track.id, track.time_since_update);
            }
        }
        self.tracks.retain(|t| t.state != TrackState::Deleted);

        // Reconciliation pass: the solver's indices are internal, so each
        // confirmed-and-updated track is re-attached to the caller's list
        // by nearest box.
        let mut claimed: HashSet<usize> = HashSet::new();
        for track in &self.tracks {
            if track.state != TrackState::Confirmed || track.time_since_update >= 1 {
                continue;
            }
            let Some(det_idx) = nearest_box(
                &track.state_rect(),
                &det_rects,
                self.config.reconcile_spread,
            ) else {
                continue;
            };
            if !claimed.insert(det_idx) {
                continue;
            }
            let record = &mut records[det_idx];
            record.id = Some(track.id);
            record.inherit_tags_from(&track.face_id, &track.deep_id);
        }

        Ok(records)
    }
}
