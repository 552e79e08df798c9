//! Bounded per-track appearance gallery with cosine distance.

use ndarray::Array2;
use std::collections::{HashMap, VecDeque};

/// Nearest-neighbor cosine metric over a rolling gallery of appearance
/// features.
///
/// Each track keeps at most `budget` of its most recent features; the
/// distance of a detection to a track is the minimum cosine distance over
/// that gallery. Features are L2-normalized on insertion so the cosine
/// distance reduces to `1 - dot`.
#[derive(Debug, Clone)]
pub struct NearestNeighborMetric {
    budget: Option<usize>,
    samples: HashMap<u64, VecDeque<Vec<f32>>>,
}

impl NearestNeighborMetric {
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            budget,
            samples: HashMap::new(),
        }
    }

    /// Number of gallery entries for a track.
    pub fn gallery_len(&self, track_id: u64) -> usize {
        self.samples.get(&track_id).map_or(0, VecDeque::len)
    }

    /// Fold freshly observed features into the galleries and drop the
    /// galleries of tracks that are no longer active.
    pub fn partial_fit(&mut self, features: Vec<(u64, Vec<f32>)>, active_targets: &[u64]) {
        for (target, feature) in features {
            let gallery = self.samples.entry(target).or_default();
            gallery.push_back(normalize(feature));
            if let Some(budget) = self.budget {
                while gallery.len() > budget {
                    gallery.pop_front();
                }
            }
        }
        self.samples.retain(|id, _| active_targets.contains(id));
    }

    /// Cost matrix of shape (detections, targets): minimum cosine distance
    /// of each detection feature to each target's gallery. Targets with an
    /// empty gallery cost the maximum distance of 1.
    pub fn distance(&self, features: &[Vec<f32>], targets: &[u64]) -> Array2<f32> {
        let queries: Vec<Vec<f32>> = features.iter().map(|f| normalize(f.clone())).collect();
        let mut cost = Array2::from_elem((features.len(), targets.len()), 1.0f32);
        for (j, target) in targets.iter().enumerate() {
            let Some(gallery) = self.samples.get(target) else {
                continue;
            };
            for (i, query) in queries.iter().enumerate() {
                let best = gallery
                    .iter()
                    .map(|sample| 1.0 - dot(sample, query))
                    .fold(f32::INFINITY, f32::min);
                if best.is_finite() {
                    cost[[i, j]] = best;
                }
            }
        }
        cost
    }
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identical_feature_has_zero_distance() {
        let mut metric = NearestNeighborMetric::new(None);
        metric.partial_fit(vec![(1, vec![1.0, 0.0, 0.0])], &[1]);

        let cost = metric.distance(&[vec![2.0, 0.0, 0.0]], &[1]);
        assert_abs_diff_eq!(cost[[0, 0]], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_orthogonal_feature_has_unit_distance() {
        let mut metric = NearestNeighborMetric::new(None);
        metric.partial_fit(vec![(1, vec![1.0, 0.0])], &[1]);

        let cost = metric.distance(&[vec![0.0, 1.0]], &[1]);
        assert_abs_diff_eq!(cost[[0, 0]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_budget_bounds_gallery() {
        let mut metric = NearestNeighborMetric::new(Some(3));
        for i in 0..10 {
            metric.partial_fit(vec![(7, vec![i as f32, 1.0])], &[7]);
        }
        assert_eq!(metric.gallery_len(7), 3);
    }

    #[test]
    fn test_inactive_targets_are_dropped() {
        let mut metric = NearestNeighborMetric::new(None);
        metric.partial_fit(vec![(1, vec![1.0]), (2, vec![1.0])], &[1, 2]);
        metric.partial_fit(vec![], &[2]);
        assert_eq!(metric.gallery_len(1), 0);
        assert_eq!(metric.gallery_len(2), 1);
    }

    #[test]
    fn test_distance_is_min_over_gallery() {
        let mut metric = NearestNeighborMetric::new(None);
        metric.partial_fit(
            vec![(1, vec![1.0, 0.0]), (1, vec![0.0, 1.0])],
            &[1],
        );
        let cost = metric.distance(&[vec![0.0, 3.0]], &[1]);
        assert_abs_diff_eq!(cost[[0, 0]], 0.0, epsilon = 1e-6);
    }
}
