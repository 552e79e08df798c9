//! Constant-velocity Kalman box track: the motion model of the SORT-style
//! tracker.
//!
//! State is 7-dimensional: center x, center y, scale (area), aspect ratio
//! and the velocities of the first three. The aspect ratio carries no
//! velocity. Measurements are the 4-dimensional XYSR box observation.

use ndarray::{Array1, Array2};

use crate::tracker::detection::IdentityTag;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

const DIM_X: usize = 7;
const DIM_Z: usize = 4;

/// Diagonal of the measurement noise covariance: uncertainties of the
/// (x, y, s, r) observation. Scale and ratio are an order of magnitude
/// noisier than position.
pub const DEFAULT_MEASUREMENT_NOISE: [f64; 4] = [1.0, 1.0, 10.0, 10.0];

/// Diagonal of the process noise covariance over (x, y, s, r, vx, vy, vs).
pub const DEFAULT_PROCESS_NOISE: [f64; 7] = [1.0, 1.0, 1.0, 1.0, 0.01, 0.01, 0.0001];

/// Linear Kalman filter over the XYSR box state, built on ndarray with a
/// nalgebra 4x4 inverse so no BLAS/LAPACK backend is needed.
#[derive(Debug, Clone)]
struct BoxMotionFilter {
    x: Array1<f64>,
    p: Array2<f64>,
    f: Array2<f64>,
    h: Array2<f64>,
    r: Array2<f64>,
    q: Array2<f64>,
}

impl BoxMotionFilter {
    fn new(z: [f64; 4], measurement_noise: [f64; 4], process_noise: [f64; 7]) -> Self {
        let mut x = Array1::zeros(DIM_X);
        for i in 0..DIM_Z {
            x[i] = z[i];
        }

        // Constant velocity on position and scale; ratio is static.
        let mut f = Array2::eye(DIM_X);
        f[[0, 4]] = 1.0;
        f[[1, 5]] = 1.0;
        f[[2, 6]] = 1.0;

        let mut h = Array2::zeros((DIM_Z, DIM_X));
        for i in 0..DIM_Z {
            h[[i, i]] = 1.0;
        }

        let mut r = Array2::zeros((DIM_Z, DIM_Z));
        for i in 0..DIM_Z {
            r[[i, i]] = measurement_noise[i];
        }

        let mut q = Array2::zeros((DIM_X, DIM_X));
        for i in 0..DIM_X {
            q[[i, i]] = process_noise[i];
        }

        // High uncertainty for the unobserved initial velocities.
        let mut p = Array2::zeros((DIM_X, DIM_X));
        let p_diag = [10.0, 10.0, 10.0, 10.0, 10000.0, 10000.0, 10000.0];
        for i in 0..DIM_X {
            p[[i, i]] = p_diag[i];
        }

        Self { x, p, f, h, r, q }
    }

    fn predict(&mut self) {
        self.x = self.f.dot(&self.x);
        self.p = self.f.dot(&self.p).dot(&self.f.t()) + &self.q;
    }

    fn update(&mut self, z: [f64; 4]) {
        let z = Array1::from_vec(z.to_vec());
        let innovation = z - self.h.dot(&self.x);

        // S = H P H^T + R, K = P H^T S^-1
        let s = self.h.dot(&self.p).dot(&self.h.t()) + &self.r;
        let s_inv = invert_4x4(&s);
        let gain = self.p.dot(&self.h.t()).dot(&s_inv);

        self.x = &self.x + &gain.dot(&innovation);
        let identity = Array2::eye(DIM_X);
        self.p = (identity - gain.dot(&self.h)).dot(&self.p);
    }
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

/// A single tracked box with its filter and lifecycle counters.
#[derive(Debug, Clone)]
pub struct KalmanBoxTrack {
    /// Unique track identifier, allocated by the owning tracker instance
    pub id: u64,
    kf: BoxMotionFilter,
    /// Current lifecycle state
    pub state: TrackState,
    /// Number of matched updates over the track's lifetime
    pub hits: u32,
    /// Number of consecutive frames with a matched update
    pub hit_streak: u32,
    /// Number of prediction steps the track has lived
    pub age: u32,
    /// Frames since the last matched update
    pub time_since_update: u32,
    /// Last-known face identity, inherited from matched detections
    pub face_id: Option<IdentityTag>,
    /// Last-known body identity, inherited from matched detections
    pub deep_id: Option<IdentityTag>,
}

impl KalmanBoxTrack {
    pub fn new(
        id: u64,
        rect: Rect,
        measurement_noise: [f64; 4],
        process_noise: [f64; 7],
    ) -> Self {
        let z = rect.to_xysr();
        let z = [z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64];
        Self {
            id,
            kf: BoxMotionFilter::new(z, measurement_noise, process_noise),
            state: TrackState::Tentative,
            hits: 1,
            hit_streak: 0,
            age: 0,
            time_since_update: 0,
            face_id: None,
            deep_id: None,
        }
    }

    /// Advance the state one step and return the predicted box.
    ///
    /// A prediction that would drive the scale negative zeroes the scale
    /// rate first, keeping the derived box well-formed.
    pub fn predict(&mut self) -> Rect {
        if self.kf.x[2] + self.kf.x[6] <= 0.0 {
            self.kf.x[6] = 0.0;
        }
        self.kf.predict();

        self.age += 1;
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;

        self.state_rect()
    }

    /// Correct the state with an observed box.
    pub fn update(&mut self, rect: Rect) {
        let z = rect.to_xysr();
        self.kf
            .update([z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64]);

        self.time_since_update = 0;
        self.hits += 1;
        self.hit_streak += 1;
    }

    /// Current box estimate from the state vector, independent of
    /// prediction.
    pub fn state_rect(&self) -> Rect {
        Rect::from_xysr(
            self.kf.x[0] as f32,
            self.kf.x[1] as f32,
            self.kf.x[2] as f32,
            self.kf.x[3] as f32,
        )
    }

    /// Promote a tentative track once it has streaked long enough, or
    /// during the tracker's startup grace window.
    pub fn promote(&mut self, min_hits: u32, frame_count: u64) {
        if self.state == TrackState::Tentative
            && (self.hit_streak >= min_hits || frame_count <= min_hits as u64)
        {
            self.state = TrackState::Confirmed;
        }
    }
}
