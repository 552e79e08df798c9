//! Kalman filter over the XYAH box state, using ndarray and a
//! nalgebra-based inverse.
//!
//! State is 8-dimensional: center x, center y, aspect ratio, height and
//! their velocities. Noise scales with the box height, so large (near)
//! targets tolerate more absolute movement than small (far) ones.

use ndarray::{Array1, Array2};

use crate::tracker::rect::Rect;

/// 0.95 quantile of the chi-square distribution with 4 degrees of
/// freedom; the gate for Mahalanobis distances of 4-dim measurements.
pub const GATING_THRESHOLD: f64 = 9.4877;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let ndim = 4;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a new state distribution from an observed box.
    pub fn initiate(&self, rect: &Rect) -> (Array1<f64>, Array2<f64>) {
        let z = xyah(rect);

        let mut mean = Array1::zeros(8);
        for i in 0..4 {
            mean[i] = z[i];
        }

        let h = z[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        let mut cov = Array2::zeros((8, 8));
        for i in 0..8 {
            cov[[i, i]] = std[i] * std[i];
        }

        (mean, cov)
    }

    /// One constant-velocity prediction step.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];

        let mut motion_cov = Array2::zeros((8, 8));
        for i in 0..8 {
            motion_cov[[i, i]] = std[i] * std[i];
        }

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;

        (new_mean, new_covariance)
    }

    /// Project the state distribution into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ];

        let mut innovation_cov = Array2::zeros((4, 4));
        for i in 0..4 {
            innovation_cov[[i, i]] = std[i] * std[i];
        }

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Kalman correction step against an observed box.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        rect: &Rect,
    ) -> (Array1<f64>, Array2<f64>) {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement = Array1::from_vec(xyah(rect).to_vec());
        let innovation = measurement - projected_mean;

        // K = P H^T S^-1; H is [I 0], so P H^T is the left 8x4 block of P.
        let s_inv = invert_4x4(&projected_cov);
        let kalman_gain = covariance.dot(&self.update_mat.t()).dot(&s_inv);

        let new_mean = mean + kalman_gain.dot(&innovation);
        let new_covariance = covariance - kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        (new_mean, new_covariance)
    }

    /// Squared Mahalanobis distance between the state distribution and
    /// each candidate box. Distances above [`GATING_THRESHOLD`] mark
    /// motion-implausible associations.
    pub fn gating_distance(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        rects: &[Rect],
    ) -> Vec<f64> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s_inv = invert_4x4(&projected_cov);

        rects
            .iter()
            .map(|rect| {
                let z = xyah(rect);
                let d = Array1::from_vec(z.to_vec()) - &projected_mean;
                d.dot(&s_inv.dot(&d))
            })
            .collect()
    }

    /// Bounding box derived from a state mean.
    pub fn state_rect(mean: &Array1<f64>) -> Rect {
        Rect::from_xyah(mean[0] as f32, mean[1] as f32, mean[2] as f32, mean[3] as f32)
    }
}

fn xyah(rect: &Rect) -> [f64; 4] {
    let z = rect.to_xyah();
    [z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64]
}

/// Helper to invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Array2<f64> {
    let mut nm = nalgebra::Matrix4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            nm[(i, j)] = m[[i, j]];
        }
    }
    let inv = nm.try_inverse().expect("4x4 matrix inversion failed");
    let mut res = Array2::zeros((4, 4));
    for i in 0..4 {
        for j in 0..4 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_initiate_centers_on_measurement() {
        let kf = KalmanFilter::new();
        let rect = Rect::new(90.0, 175.0, 20.0, 50.0);
        let (mean, _) = kf.initiate(&rect);
        assert_abs_diff_eq!(mean[0], 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mean[1], 200.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mean[3], 50.0, epsilon = 1e-6);
        // velocities start at rest
        for i in 4..8 {
            assert_eq!(mean[i], 0.0);
        }
    }

    #[test]
    fn test_gating_distance_orders_candidates() {
        let kf = KalmanFilter::new();
        let rect = Rect::new(0.0, 0.0, 20.0, 50.0);
        let (mean, cov) = kf.initiate(&rect);
        let (mean, cov) = kf.predict(&mean, &cov);

        let near = Rect::new(1.0, 1.0, 20.0, 50.0);
        let far = Rect::new(500.0, 500.0, 20.0, 50.0);
        let distances = kf.gating_distance(&mean, &cov, &[near, far]);

        assert!(distances[0] < GATING_THRESHOLD);
        assert!(distances[1] > GATING_THRESHOLD);
    }
}
