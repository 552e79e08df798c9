//! Association engine: cost matrices, gating and the assignment solve.
//!
//! All three trackers funnel through [`linear_assignment`]: cost rows are
//! detections, columns are tracks, and the result partitions both index
//! sets exactly into matched and unmatched.

use ndarray::Array2;

use crate::tracker::rect::Rect;

/// Sentinel cost for gated-out pairs, far above any feasible cost.
pub const REJECT_COST: f32 = 1e6;

/// Result of one assignment solve.
///
/// `matches` holds `(detection_index, track_index)` pairs. Together with
/// `unmatched_detections` and `unmatched_tracks` it partitions
/// `{0..n_detections-1}` and `{0..n_tracks-1}` with no duplicates.
#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_tracks: Vec<usize>,
}

/// IoU cost matrix: `cost[i][j] = 1 - IOU(detection_i, track_j)`.
pub fn iou_cost(det_boxes: &[Rect], track_boxes: &[Rect]) -> Array2<f32> {
    let mut cost = crate::tracker::rect::iou_batch(det_boxes, track_boxes);
    cost.mapv_inplace(|iou| 1.0 - iou);
    cost
}

/// Euclidean cost matrix over representative points.
///
/// Pairs farther apart than `max_spread` are poisoned with [`REJECT_COST`]
/// so the solver never prefers them over leaving a row unmatched.
pub fn euclidean_cost(
    points_a: &[(i32, i32)],
    points_b: &[(i32, i32)],
    max_spread: f32,
) -> Array2<f32> {
    let mut cost = Array2::zeros((points_a.len(), points_b.len()));
    for (i, a) in points_a.iter().enumerate() {
        for (j, b) in points_b.iter().enumerate() {
            let dx = (a.0 - b.0) as f32;
            let dy = (a.1 - b.1) as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            cost[[i, j]] = if dist > max_spread { REJECT_COST } else { dist };
        }
    }
    cost
}

/// Solve a possibly-rectangular assignment problem under a gating
/// threshold.
///
/// Cells with `cost > thresh` are infeasible: a selected pair above the
/// threshold is rejected after the solve, and a row or column with no
/// feasible partner ends up unmatched. When gating leaves at most one
/// candidate per row and per column the solve is skipped entirely; the
/// direct assignment is provably identical to the optimal one.
pub fn linear_assignment(cost: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (n_dets, n_tracks) = cost.dim();

    if n_dets == 0 || n_tracks == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_detections: (0..n_dets).collect(),
            unmatched_tracks: (0..n_tracks).collect(),
        };
    }

    if let Some(result) = greedy_fast_path(cost, thresh) {
        return result;
    }

    // Pad to square with a large sentinel so lapjv accepts rectangular
    // problems; padding rows/columns absorb the surplus.
    let size = n_dets.max(n_tracks);
    let mut padded = Array2::<f64>::from_elem((size, size), REJECT_COST as f64);
    for i in 0..n_dets {
        for j in 0..n_tracks {
            padded[[i, j]] = cost[[i, j]] as f64;
        }
    }

    let mut matches = vec![];
    let mut unmatched_detections = vec![];
    let mut matched_tracks = vec![false; n_tracks];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (det_idx, &track_idx) in row_to_col.iter().enumerate().take(n_dets) {
                if track_idx < n_tracks && cost[[det_idx, track_idx]] <= thresh {
                    matches.push((det_idx, track_idx));
                    matched_tracks[track_idx] = true;
                } else {
                    unmatched_detections.push(det_idx);
                }
            }
        }
        Err(_) => {
            unmatched_detections = (0..n_dets).collect();
        }
    }

    let unmatched_tracks = matched_tracks
        .iter()
        .enumerate()
        .filter_map(|(j, &hit)| if hit { None } else { Some(j) })
        .collect();

    AssignmentResult {
        matches,
        unmatched_detections,
        unmatched_tracks,
    }
}

/// Direct assignment for the unambiguous case: after gating, every row and
/// every column has at most one feasible candidate. Returns `None` when
/// the input is ambiguous and needs the general solver.
fn greedy_fast_path(cost: &Array2<f32>, thresh: f32) -> Option<AssignmentResult> {
    let (n_dets, n_tracks) = cost.dim();
    let mut row_counts = vec![0usize; n_dets];
    let mut col_counts = vec![0usize; n_tracks];

    for i in 0..n_dets {
        for j in 0..n_tracks {
            if cost[[i, j]] <= thresh {
                row_counts[i] += 1;
                col_counts[j] += 1;
                if row_counts[i] > 1 || col_counts[j] > 1 {
                    return None;
                }
            }
        }
    }

    let mut matches = vec![];
    let mut unmatched_detections = vec![];
    let mut matched_tracks = vec![false; n_tracks];

    for i in 0..n_dets {
        let mut hit = None;
        for j in 0..n_tracks {
            if cost[[i, j]] <= thresh {
                hit = Some(j);
                break;
            }
        }
        match hit {
            Some(j) => {
                matches.push((i, j));
                matched_tracks[j] = true;
            }
            None => unmatched_detections.push(i),
        }
    }

    let unmatched_tracks = matched_tracks
        .iter()
        .enumerate()
        .filter_map(|(j, &hit)| if hit { None } else { Some(j) })
        .collect();

    Some(AssignmentResult {
        matches,
        unmatched_detections,
        unmatched_tracks,
    })
}

/// Confidence-ordered non-max suppression.
///
/// Returns the indices of kept detections, highest confidence first. A box
/// is suppressed when its IoU with an already-kept box exceeds
/// `max_overlap`.
pub fn suppress_overlaps(boxes: &[Rect], confidences: &[f32], max_overlap: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        confidences[b]
            .partial_cmp(&confidences[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<usize> = vec![];
    for &idx in &order {
        if kept
            .iter()
            .all(|&k| boxes[k].iou(&boxes[idx]) <= max_overlap)
        {
            kept.push(idx);
        }
    }
    kept
}

/// Find the caller's detection closest to a tracker-output box, by the
/// maximum per-coordinate corner difference. `None` if the best candidate
/// still differs by more than `spread` on some coordinate.
pub fn nearest_box(track_box: &Rect, detections: &[Rect], spread: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, det) in detections.iter().enumerate() {
        let diff = track_box.corner_spread(det);
        if best.map_or(true, |(_, d)| diff < d) {
            best = Some((idx, diff));
        }
    }
    best.and_then(|(idx, diff)| (diff <= spread).then_some(idx))
}
