//! Multi-target tracker matching appearance-first, cascaded by recency.

use log::debug;

use crate::tracker::assignment::{REJECT_COST, iou_cost, linear_assignment};
use crate::tracker::deep::kalman_filter::{GATING_THRESHOLD, KalmanFilter};
use crate::tracker::deep::nn_metric::NearestNeighborMetric;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

use ndarray::{Array1, Array2};

/// Input to the embedded tracker: a box, its confidence and the
/// appearance embedding extracted for it.
#[derive(Debug, Clone)]
pub struct DeepDetection {
    pub rect: Rect,
    pub confidence: f32,
    pub feature: Vec<f32>,
}

/// A single target with XYAH Kalman state and a pending feature buffer.
#[derive(Debug, Clone)]
pub struct Track {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    /// Unique track identifier
    pub id: u64,
    /// Lifecycle state
    pub state: TrackState,
    /// Total matched updates
    pub hits: u32,
    /// Frames since the track was created
    pub age: u32,
    /// Frames since the last matched update
    pub time_since_update: u32,
    /// Features observed since the last gallery flush
    features: Vec<Vec<f32>>,
}

impl Track {
    fn new(mean: Array1<f64>, covariance: Array2<f64>, id: u64, feature: Vec<f32>) -> Self {
        Self {
            mean,
            covariance,
            id,
            state: TrackState::Tentative,
            hits: 1,
            age: 1,
            time_since_update: 0,
            features: vec![feature],
        }
    }

    fn predict(&mut self, kf: &KalmanFilter) {
        let (mean, covariance) = kf.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.age += 1;
        self.time_since_update += 1;
    }

    fn update(&mut self, kf: &KalmanFilter, detection: &DeepDetection, n_init: u32) {
        let (mean, covariance) = kf.update(&self.mean, &self.covariance, &detection.rect);
        self.mean = mean;
        self.covariance = covariance;
        self.features.push(detection.feature.clone());

        self.hits += 1;
        self.time_since_update = 0;
        if self.state == TrackState::Tentative && self.hits >= n_init {
            self.state = TrackState::Confirmed;
        }
    }

    fn mark_missed(&mut self, max_age: u32) {
        if self.state == TrackState::Tentative {
            self.state = TrackState::Deleted;
        } else if self.time_since_update > max_age {
            self.state = TrackState::Deleted;
        }
    }

    /// Current box estimate.
    pub fn rect(&self) -> Rect {
        KalmanFilter::state_rect(&self.mean)
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    fn take_features(&mut self) -> Vec<Vec<f32>> {
        std::mem::take(&mut self.features)
    }
}

/// The embedded appearance tracker.
pub struct DeepTracker {
    kf: KalmanFilter,
    metric: NearestNeighborMetric,
    tracks: Vec<Track>,
    next_id: u64,
    max_cosine_distance: f32,
    max_iou_distance: f32,
    max_age: u32,
    n_init: u32,
}

impl DeepTracker {
    pub fn new(
        max_cosine_distance: f32,
        nn_budget: Option<usize>,
        max_iou_distance: f32,
        max_age: u32,
        n_init: u32,
    ) -> Self {
        Self {
            kf: KalmanFilter::new(),
            metric: NearestNeighborMetric::new(nn_budget),
            tracks: Vec::new(),
            next_id: 1,
            max_cosine_distance,
            max_iou_distance,
            max_age,
            n_init,
        }
    }

    /// Live tracks, in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Propagate all track states one step forward. Call once per frame,
    /// before [`DeepTracker::update`].
    ///
    /// A track whose predicted state went non-finite is dead and dropped
    /// here, before it can poison a cost matrix.
    pub fn predict(&mut self) {
        for track in &mut self.tracks {
            track.predict(&self.kf);
        }
        self.tracks.retain(|t| t.rect().is_finite());
    }

    /// Run the matching cascade and track management for one frame.
    pub fn update(&mut self, detections: &[DeepDetection]) {
        let (matches, unmatched_tracks, unmatched_detections) = self.match_cascade(detections);

        for (track_idx, det_idx) in matches {
            self.tracks[track_idx].update(&self.kf, &detections[det_idx], self.n_init);
        }
        for track_idx in unmatched_tracks {
            self.tracks[track_idx].mark_missed(self.max_age);
        }
        for det_idx in unmatched_detections {
            self.initiate_track(&detections[det_idx]);
        }

        for track in &self.tracks {
            if track.state == TrackState::Deleted {
                debug!("appearance track {} deleted", track.id);
            }
        }
        self.tracks.retain(|t| t.state != TrackState::Deleted);

        // Flush pending features of confirmed tracks into the gallery and
        // forget galleries of departed tracks.
        let active: Vec<u64> = self
            .tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| t.id)
            .collect();
        let mut flushed = Vec::new();
        for track in self.tracks.iter_mut().filter(|t| t.is_confirmed()) {
            let id = track.id;
            flushed.extend(track.take_features().into_iter().map(|f| (id, f)));
        }
        self.metric.partial_fit(flushed, &active);
    }

    /// Appearance cascade over confirmed tracks, most recently seen
    /// first, followed by an IoU pass over unconfirmed tracks and tracks
    /// missed exactly one frame.
    ///
    /// Returns `(matches, unmatched_tracks, unmatched_detections)` with
    /// matches as `(track_index, detection_index)`.
    fn match_cascade(
        &self,
        detections: &[DeepDetection],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        let confirmed: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| self.tracks[i].is_confirmed())
            .collect();
        let unconfirmed: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| !self.tracks[i].is_confirmed())
            .collect();

        let mut matches: Vec<(usize, usize)> = Vec::new();
        let mut unmatched_detections: Vec<usize> = (0..detections.len()).collect();

        for level in 0..self.max_age {
            if unmatched_detections.is_empty() {
                break;
            }
            let candidates: Vec<usize> = confirmed
                .iter()
                .copied()
                .filter(|&i| self.tracks[i].time_since_update == level + 1)
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let features: Vec<Vec<f32>> = unmatched_detections
                .iter()
                .map(|&d| detections[d].feature.clone())
                .collect();
            let targets: Vec<u64> = candidates.iter().map(|&i| self.tracks[i].id).collect();
            let mut cost = self.metric.distance(&features, &targets);

            // Invalidate motion-implausible pairs.
            let det_rects: Vec<Rect> = unmatched_detections
                .iter()
                .map(|&d| detections[d].rect)
                .collect();
            for (j, &track_idx) in candidates.iter().enumerate() {
                let track = &self.tracks[track_idx];
                let gating =
                    self.kf
                        .gating_distance(&track.mean, &track.covariance, &det_rects);
                for (i, &g) in gating.iter().enumerate() {
                    if g > GATING_THRESHOLD {
                        cost[[i, j]] = REJECT_COST;
                    }
                }
            }

            let result = linear_assignment(&cost, self.max_cosine_distance);
            for &(di, tj) in &result.matches {
                matches.push((candidates[tj], unmatched_detections[di]));
            }
            unmatched_detections = result
                .unmatched_detections
                .iter()
                .map(|&di| unmatched_detections[di])
                .collect();
        }

        let matched_track_set: std::collections::HashSet<usize> =
            matches.iter().map(|m| m.0).collect();
        let cascade_leftovers: Vec<usize> = confirmed
            .iter()
            .copied()
            .filter(|i| !matched_track_set.contains(i))
            .collect();

        // Unconfirmed tracks and confirmed tracks missed exactly one frame
        // get a second chance on plain overlap.
        let mut iou_candidates = unconfirmed;
        let mut unmatched_tracks: Vec<usize> = Vec::new();
        for idx in cascade_leftovers {
            if self.tracks[idx].time_since_update == 1 {
                iou_candidates.push(idx);
            } else {
                unmatched_tracks.push(idx);
            }
        }

        let det_rects: Vec<Rect> = unmatched_detections
            .iter()
            .map(|&d| detections[d].rect)
            .collect();
        let track_rects: Vec<Rect> = iou_candidates
            .iter()
            .map(|&i| self.tracks[i].rect())
            .collect();
        let cost = iou_cost(&det_rects, &track_rects);
        let result = linear_assignment(&cost, self.max_iou_distance);

        for &(di, tj) in &result.matches {
            matches.push((iou_candidates[tj], unmatched_detections[di]));
        }
        unmatched_tracks.extend(result.unmatched_tracks.iter().map(|&tj| iou_candidates[tj]));
        let unmatched_detections: Vec<usize> = result
            .unmatched_detections
            .iter()
            .map(|&di| unmatched_detections[di])
            .collect();

        (matches, unmatched_tracks, unmatched_detections)
    }

    fn initiate_track(&mut self, detection: &DeepDetection) {
        let (mean, covariance) = self.kf.initiate(&detection.rect);
        let track = Track::new(mean, covariance, self.next_id, detection.feature.clone());
        debug!("appearance track {} born at {:?}", track.id, detection.rect);
        self.next_id += 1;
        self.tracks.push(track);
    }
}
