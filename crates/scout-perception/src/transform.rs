//! Rover-centric and world coordinate transforms.
//!
//! Pixels of the top-down (warped) image are first expressed in the rover
//! frame: origin at the bottom-centre of the image, `+x` pointing forward
//! (up the image) and `+y` pointing left.  From there a [`RoverToWorld`]
//! transform rotates by the rover yaw, scales down to map cells and
//! translates by the rover position.
//!
//! # Example
//!
//! ```rust
//! use scout_perception::transform::{RoverPoint, RoverToWorld};
//!
//! // Rover at (100, 100) facing +x; a point 20 px ahead lands 2 cells ahead.
//! let tf = RoverToWorld::new(100.0, 100.0, 0.0);
//! let cell = tf.to_cell(RoverPoint::new(20.0, 0.0), 200);
//! assert_eq!((cell.x, cell.y), (102, 100));
//! ```

use scout_types::GridCell;

/// Rover-frame pixels per world-map cell.
pub const DEFAULT_SCALE: f32 = 10.0;

/// Side length of the square world map, in cells.
pub const DEFAULT_WORLD_SIZE: u16 = 200;

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A point in the rover frame, in top-down image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoverPoint {
    pub x: f32,
    pub y: f32,
}

impl RoverPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert an image pixel (column, row) of a `width × height` top-down
    /// image into the rover frame.
    pub fn from_pixel(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self::from_image(col as f32, row as f32, width, height)
    }

    /// Like [`from_pixel`][Self::from_pixel] for sub-pixel image coordinates.
    pub fn from_image(u: f32, v: f32, width: u32, height: u32) -> Self {
        Self {
            x: height as f32 - v,
            y: -(u - width as f32 / 2.0),
        }
    }

    /// Distance from the rover.
    pub fn range(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Angle off the rover heading in radians, positive to the left.
    pub fn bearing(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotate counter-clockwise by `yaw_deg` degrees.
    pub fn rotate(self, yaw_deg: f32) -> Self {
        let (sin, cos) = yaw_deg.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

/// A continuous position in world-map cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// RoverToWorld
// ────────────────────────────────────────────────────────────────────────────

/// Rotation, scaling and translation from the rover frame into the world map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoverToWorld {
    pub x: f32,
    pub y: f32,
    pub yaw_deg: f32,
    /// Rover-frame pixels per world cell.
    pub scale: f32,
}

impl RoverToWorld {
    /// Transform for a rover at `(x, y)` with heading `yaw_deg`, using
    /// [`DEFAULT_SCALE`].
    pub fn new(x: f32, y: f32, yaw_deg: f32) -> Self {
        Self {
            x,
            y,
            yaw_deg,
            scale: DEFAULT_SCALE,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Map a rover-frame point to a continuous world position.
    pub fn apply(&self, point: RoverPoint) -> WorldPoint {
        let rotated = point.rotate(self.yaw_deg);
        WorldPoint {
            x: self.x + rotated.x / self.scale,
            y: self.y + rotated.y / self.scale,
        }
    }

    /// Map a rover-frame point to a world cell, truncating toward zero and
    /// clipping to `[0, world_size - 1]`.
    pub fn to_cell(&self, point: RoverPoint, world_size: u16) -> GridCell {
        let world = self.apply(point);
        let max = i64::from(world_size.saturating_sub(1));
        let clip = |v: f32| (v as i64).clamp(0, max) as u16;
        GridCell {
            x: clip(world.x),
            y: clip(world.y),
        }
    }
}

/// Inverse of [`RoverToWorld::apply`]: express a world position in the
/// rover frame.
pub fn world_to_rover(tf: &RoverToWorld, world: WorldPoint) -> RoverPoint {
    let dx = (world.x - tf.x) * tf.scale;
    let dy = (world.y - tf.y) * tf.scale;
    RoverPoint::new(dx, dy).rotate(-tf.yaw_deg)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
