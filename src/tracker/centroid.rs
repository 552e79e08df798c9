//! Nearest-point tracker: pure frame-to-frame identity carry-over with no
//! persistent motion state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tracker::MultiObjectTracker;
use crate::tracker::assignment::{euclidean_cost, linear_assignment};
use crate::tracker::detection::{Detection, validate_detections};
use crate::tracker::error::TrackError;

/// Configuration for [`CentroidTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidConfig {
    /// Maximum point distance (pixels) for carrying an identity between
    /// consecutive frames.
    pub max_spread: f32,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self { max_spread: 50.0 }
    }
}

/// Tracker that associates detections across consecutive frames by the
/// Euclidean distance of their representative points.
///
/// The only carried state is the previous frame's annotated records: a
/// record unmatched at the end of a frame is simply dropped. Matched
/// records inherit `{id, face_id, deep_id, misc}` from their predecessor;
/// everything else receives a freshly allocated id. Records without a
/// representative point never associate and always get a fresh id.
pub struct CentroidTracker {
    config: CentroidConfig,
    prev: Vec<Detection>,
    next_id: u64,
}

impl CentroidTracker {
    pub fn new(config: CentroidConfig) -> Self {
        Self {
            config,
            prev: Vec::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(CentroidConfig::default())
    }
}

impl MultiObjectTracker for CentroidTracker {
    fn update(&mut self, detections: Vec<Detection>) -> Result<Vec<Detection>, TrackError> {
        validate_detections(&detections)?;

        let mut records = detections;
        for record in &mut records {
            record.id = None;
        }

        // Only records with a representative point take part in the
        // association; the previous frame contributes likewise.
        let curr_idx: Vec<usize> = records
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.point.map(|_| i))
            .collect();
        let prev_idx: Vec<usize> = self
            .prev
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.point.map(|_| i))
            .collect();

        let curr_points: Vec<(i32, i32)> = curr_idx.iter().map(|&i| records[i].point.unwrap()).collect();
        let prev_points: Vec<(i32, i32)> = prev_idx.iter().map(|&i| self.prev[i].point.unwrap()).collect();

        let cost = euclidean_cost(&curr_points, &prev_points, self.config.max_spread);
        let result = linear_assignment(&cost, self.config.max_spread);

        // First record to claim an inherited id wins; a duplicate claim
        // falls through to a fresh allocation.
        let mut claimed: HashSet<u64> = HashSet::new();
        for &(ci, pi) in &result.matches {
            let prev_record = &self.prev[prev_idx[pi]];
            let Some(prev_id) = prev_record.id else {
                continue;
            };
            if !claimed.insert(prev_id) {
                continue;
            }
            let record = &mut records[curr_idx[ci]];
            record.id = Some(prev_id);
            record.inherit_tags_from(&prev_record.face_id, &prev_record.deep_id);
            if record.misc.is_none() {
                record.misc = prev_record.misc.clone();
            }
        }

        for record in &mut records {
            if record.id.is_none() {
                record.id = Some(self.allocate_id());
            }
        }

        self.prev = records.clone();
        Ok(records)
    }
}
