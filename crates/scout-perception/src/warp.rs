//! Perspective warp from the front camera to a top-down view.
//!
//! A [`Homography`] is fitted to four point correspondences (a grid square
//! seen by the camera and where that square should sit in the top-down
//! image).  [`warp_perspective`] then resamples the frame by inverse mapping
//! each output pixel, nearest-neighbour, leaving unmapped pixels black.

use scout_types::CameraFrame;

/// Tolerance below which a pivot or projective denominator counts as zero.
const EPSILON: f64 = 1e-9;

/// A 3×3 projective transform, row-major, normalised so `m[8] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [f64; 9],
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Fit the transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Returns `None` when the correspondences are degenerate (three or more
    /// collinear points).
    pub fn from_points(src: [[f32; 2]; 4], dst: [[f32; 2]; 4]) -> Option<Self> {
        // Eight equations in h0..h7 with h8 fixed to 1.
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (f64::from(src[i][0]), f64::from(src[i][1]));
            let (u, v) = (f64::from(dst[i][0]), f64::from(dst[i][1]));
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }
        let h = solve_augmented(a)?;
        Some(Self {
            m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
        })
    }

    /// Project `(x, y)`.  `None` for points on the line at infinity.
    pub fn apply(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (x, y) = (f64::from(x), f64::from(y));
        let m = &self.m;
        let w = m[6] * x + m[7] * y + m[8];
        if w.abs() < EPSILON {
            return None;
        }
        let u = (m[0] * x + m[1] * y + m[2]) / w;
        let v = (m[3] * x + m[4] * y + m[5]) / w;
        Some((u as f32, v as f32))
    }

    pub fn inverse(&self) -> Option<Self> {
        let m = &self.m;
        let adj = [
            m[4] * m[8] - m[5] * m[7],
            m[2] * m[7] - m[1] * m[8],
            m[1] * m[5] - m[2] * m[4],
            m[5] * m[6] - m[3] * m[8],
            m[0] * m[8] - m[2] * m[6],
            m[2] * m[3] - m[0] * m[5],
            m[3] * m[7] - m[4] * m[6],
            m[1] * m[6] - m[0] * m[7],
            m[0] * m[4] - m[1] * m[3],
        ];
        let det = m[0] * adj[0] + m[1] * adj[3] + m[2] * adj[6];
        if det.abs() < EPSILON || adj[8].abs() < EPSILON {
            return None;
        }
        let norm = adj[8];
        let mut inv = [0.0; 9];
        for (dst, src) in inv.iter_mut().zip(adj) {
            *dst = src / norm;
        }
        Some(Self { m: inv })
    }
}

/// Gauss–Jordan elimination with partial pivoting on an 8×9 augmented matrix.
fn solve_augmented(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < EPSILON {
            return None;
        }
        a.swap(col, pivot);
        let p = a[col][col];
        for k in col..9 {
            a[col][k] /= p;
        }
        for row in 0..8 {
            if row != col {
                let factor = a[row][col];
                if factor != 0.0 {
                    for k in col..9 {
                        a[row][k] -= factor * a[col][k];
                    }
                }
            }
        }
    }
    let mut h = [0.0; 8];
    for (i, v) in h.iter_mut().enumerate() {
        *v = a[i][8];
    }
    Some(h)
}

// ────────────────────────────────────────────────────────────────────────────
// Ground calibration
// ────────────────────────────────────────────────────────────────────────────

/// Camera calibration relating a 1 m ground grid square to the top-down image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundCalibration {
    /// Corners of the grid square in the camera image (BL, BR, TR, TL).
    pub source: [[f32; 2]; 4],
    /// Half the side of the square in the top-down image, in pixels.
    pub half_size: f32,
    /// Gap between the image bottom and the rover's field of view.
    pub bottom_offset: f32,
}

impl Default for GroundCalibration {
    fn default() -> Self {
        Self {
            source: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            half_size: 5.0,
            bottom_offset: 6.0,
        }
    }
}

impl GroundCalibration {
    /// Where the grid square lands in a `width × height` top-down image.
    pub fn destination(&self, width: u32, height: u32) -> [[f32; 2]; 4] {
        let cx = width as f32 / 2.0;
        let bottom = height as f32 - self.bottom_offset;
        let top = bottom - 2.0 * self.half_size;
        [
            [cx - self.half_size, bottom],
            [cx + self.half_size, bottom],
            [cx + self.half_size, top],
            [cx - self.half_size, top],
        ]
    }

    /// Camera-to-top-down homography for frames of the given size.
    pub fn camera_to_ground(&self, width: u32, height: u32) -> Option<Homography> {
        Homography::from_points(self.source, self.destination(width, height))
    }
}

/// Resample `frame` through `homography` into an image of the same size.
///
/// Returns an all-black frame when the homography is not invertible.
pub fn warp_perspective(frame: &CameraFrame, homography: &Homography) -> CameraFrame {
    let mut out = CameraFrame::filled(frame.width, frame.height, [0, 0, 0]);
    let Some(inverse) = homography.inverse() else {
        return out;
    };
    for row in 0..frame.height {
        for col in 0..frame.width {
            let Some((sx, sy)) = inverse.apply(col as f32, row as f32) else {
                continue;
            };
            let (sx, sy) = (sx.round(), sy.round());
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            if let Some(rgb) = frame.pixel(sx as u32, sy as u32) {
                out.set_pixel(col, row, rgb);
            }
        }
    }
    out
}
