/// Bounding box representation with format conversion utilities.
///
/// Supports the box formats used across the trackers:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYSR: Center X, Center Y, Scale (area), aspect Ratio (w/h)
/// - XYAH: Center X, Center Y, Aspect ratio (w/h), Height
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYSR format (center x, center y, scale/area, aspect ratio).
    ///
    /// This is the measurement space of the constant-velocity box filter.
    /// A non-positive scale or ratio yields a degenerate zero-size box.
    #[inline]
    pub fn from_xysr(cx: f32, cy: f32, scale: f32, ratio: f32) -> Self {
        let area = scale.max(0.0);
        let width = (area * ratio.max(0.0)).sqrt();
        let height = if width > 0.0 { area / width } else { 0.0 };
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Create a Rect from XYAH format (center x, center y, aspect ratio, height).
    #[inline]
    pub fn from_xyah(cx: f32, cy: f32, aspect_ratio: f32, height: f32) -> Self {
        let width = aspect_ratio * height;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Convert to XYSR format: (center_x, center_y, scale/area, aspect_ratio).
    #[inline]
    pub fn to_xysr(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        let scale = self.width * self.height;
        let ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, scale, ratio]
    }

    /// Convert to XYAH format: (center_x, center_y, aspect_ratio, height).
    #[inline]
    pub fn to_xyah(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, aspect_ratio, self.height]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when every coordinate is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    ///
    /// A pair with zero union area has IoU 0.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Largest per-coordinate absolute difference between the TLBR corners
    /// of two boxes. Used to re-attach tracker output to the caller's
    /// detection list.
    pub fn corner_spread(&self, other: &Rect) -> f32 {
        let a = self.to_tlbr();
        let b = other.to_tlbr();
        a.iter()
            .zip(b.iter())
            .map(|(p, q)| (p - q).abs())
            .fold(0.0f32, f32::max)
    }
}

use ndarray::Array2;

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        assert_eq!(rect.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let xysr = rect.to_xysr();
        assert_eq!(xysr[0], 25.0); // cx
        assert_eq!(xysr[1], 40.0); // cy
        assert_eq!(xysr[2], 1200.0); // area
        assert_abs_diff_eq!(xysr[3], 0.75, epsilon = 1e-6); // ratio = 30/40
    }

    #[test]
    fn test_xysr_round_trip() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        let z = rect.to_xysr();
        let back = Rect::from_xysr(z[0], z[1], z[2], z[3]);

        assert_abs_diff_eq!(back.x, rect.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, rect.y, epsilon = 1e-3);
        assert_abs_diff_eq!(back.width, rect.width, epsilon = 1e-3);
        assert_abs_diff_eq!(back.height, rect.height, epsilon = 1e-3);
    }

    #[test]
    fn test_from_xyah() {
        let rect = Rect::from_xyah(25.0, 40.0, 0.75, 40.0);
        assert_abs_diff_eq!(rect.x, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rect.y, 20.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rect.width, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rect.height, 40.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection: 5x5 = 25, union: 100 + 100 - 25 = 175
        let iou = a.iou(&b);
        assert_abs_diff_eq!(iou, 25.0 / 175.0, epsilon = 1e-6);
        assert_abs_diff_eq!(iou, b.iou(&a), epsilon = 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_same_box() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_abs_diff_eq!(a.iou(&a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iou_zero_area() {
        let a = Rect::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_corner_spread() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(2.0, 1.0, 10.0, 12.0);
        // tlbr diffs: 2, 1, 2, 3 -> 3
        assert_abs_diff_eq!(a.corner_spread(&b), 3.0, epsilon = 1e-6);
    }
}
