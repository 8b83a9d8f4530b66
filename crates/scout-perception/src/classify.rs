//! Colour classification of top-down pixels into terrain layers.
//!
//! Each layer is an inclusive per-channel RGB box.  The defaults separate
//! bright sand (navigable), dark rock walls and boulders (obstacle) and the
//! yellow rock samples (target).

use scout_types::CameraFrame;

/// Inclusive per-channel RGB bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbRange {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl RgbRange {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|c| rgb[c] >= self.low[c] && rgb[c] <= self.high[c])
    }
}

/// Colour bounds for the three terrain layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorThresholds {
    pub rock: RgbRange,
    pub obstacle: RgbRange,
    pub navigable: RgbRange,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            rock: RgbRange::new([100, 100, 0], [255, 255, 80]),
            obstacle: RgbRange::new([0, 0, 0], [160, 160, 160]),
            navigable: RgbRange::new([161, 161, 161], [255, 255, 255]),
        }
    }
}

/// A binary image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn get(&self, col: u32, row: u32) -> bool {
        col < self.width && row < self.height && self.bits[self.index(col, row)]
    }

    pub fn set(&mut self, col: u32, row: u32) {
        if col < self.width && row < self.height {
            let i = self.index(col, row);
            self.bits[i] = true;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// `(col, row)` of every set pixel, row-major.
    pub fn set_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width.max(1);
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }

    fn index(&self, col: u32, row: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }
}

/// One mask per terrain layer.  A pixel can belong to several layers (a
/// dark-yellow pixel is both rock and obstacle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFrame {
    pub rocks: Mask,
    pub obstacles: Mask,
    pub navigable: Mask,
}

/// Classify every pixel of `frame` against `thresholds`.
pub fn classify(frame: &CameraFrame, thresholds: &ColorThresholds) -> ClassifiedFrame {
    let mut out = ClassifiedFrame {
        rocks: Mask::new(frame.width, frame.height),
        obstacles: Mask::new(frame.width, frame.height),
        navigable: Mask::new(frame.width, frame.height),
    };
    for row in 0..frame.height {
        for col in 0..frame.width {
            let Some(rgb) = frame.pixel(col, row) else {
                continue;
            };
            if thresholds.rock.contains(rgb) {
                out.rocks.set(col, row);
            }
            if thresholds.obstacle.contains(rgb) {
                out.obstacles.set(col, row);
            }
            if thresholds.navigable.contains(rgb) {
                out.navigable.set(col, row);
            }
        }
    }
    out
}
