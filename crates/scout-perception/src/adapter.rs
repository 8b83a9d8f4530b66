//! [`PerceptionAdapter`] – one camera frame plus pose in, one [`Observation`] out.
//!
//! Pipeline per frame:
//!
//! 1. **Attitude gate** – skip the frame when pitch or roll is more than
//!    the tolerance away from level; the ground homography is only valid for
//!    a level camera.
//! 2. **Warp** – perspective-transform the frame to a top-down view.
//! 3. **Classify** – split pixels into rock, obstacle and navigable layers.
//! 4. **Project** – express classified pixels in the rover frame (polar
//!    bearings/ranges) and in world-map cells.
//!
//! A skipped or malformed frame yields [`Observation::absent`]; `observe`
//! never panics.

use scout_types::{CameraFrame, GridCell, Observation, PolarSamples, Pose};
use tracing::{debug, warn};

use crate::classify::{classify, ColorThresholds, Mask};
use crate::transform::{RoverPoint, RoverToWorld, DEFAULT_SCALE, DEFAULT_WORLD_SIZE};
use crate::warp::{warp_perspective, GroundCalibration, Homography};

/// Tunables of the perception pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionConfig {
    /// Maximum pitch/roll deviation from level, in degrees.
    pub attitude_tolerance_deg: f32,
    pub world_size: u16,
    /// Rover-frame pixels per world cell.
    pub scale: f32,
    pub calibration: GroundCalibration,
    pub thresholds: ColorThresholds,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            attitude_tolerance_deg: 1.5,
            world_size: DEFAULT_WORLD_SIZE,
            scale: DEFAULT_SCALE,
            calibration: GroundCalibration::default(),
            thresholds: ColorThresholds::default(),
        }
    }
}

/// Stateful only in that it caches the homography for the last frame size.
#[derive(Debug, Clone)]
pub struct PerceptionAdapter {
    config: PerceptionConfig,
    homography: Option<(u32, u32, Homography)>,
}

impl Default for PerceptionAdapter {
    fn default() -> Self {
        Self::new(PerceptionConfig::default())
    }
}

impl PerceptionAdapter {
    pub fn new(config: PerceptionConfig) -> Self {
        Self {
            config,
            homography: None,
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// `true` when both pitch and roll are within tolerance of level.
    pub fn attitude_ok(&self, pose: &Pose) -> bool {
        let tol = self.config.attitude_tolerance_deg;
        is_level(pose.pitch_deg, tol) && is_level(pose.roll_deg, tol)
    }

    /// Process one frame.
    pub fn observe(&mut self, frame: &CameraFrame, pose: &Pose) -> Observation {
        if !self.attitude_ok(pose) {
            debug!(
                pitch = pose.pitch_deg,
                roll = pose.roll_deg,
                "attitude out of tolerance; frame skipped"
            );
            return Observation::absent();
        }
        if frame.width == 0 || frame.height == 0 || !frame.is_well_formed() {
            warn!(
                width = frame.width,
                height = frame.height,
                bytes = frame.data.len(),
                "malformed camera frame; frame skipped"
            );
            return Observation::absent();
        }
        let Some(homography) = self.homography_for(frame.width, frame.height) else {
            warn!("ground calibration is degenerate; frame skipped");
            return Observation::absent();
        };

        let warped = warp_perspective(frame, &homography);
        let classified = classify(&warped, &self.config.thresholds);
        let tf = RoverToWorld::new(pose.x, pose.y, pose.yaw_deg).with_scale(self.config.scale);

        let mut observation = Observation {
            navigable: Some(self.polar(&classified.navigable)),
            target: None,
            map_delta: Default::default(),
        };
        observation.map_delta.navigable = self.cells(&classified.navigable, &tf);
        observation.map_delta.obstacles = self.cells(&classified.obstacles, &tf);
        observation.map_delta.rocks = self.cells(&classified.rocks, &tf);

        if classified.rocks.count() > 0 {
            observation.target = Some(self.polar(&classified.rocks));
        }

        debug!(
            navigable = classified.navigable.count(),
            obstacles = classified.obstacles.count(),
            rocks = classified.rocks.count(),
            "frame classified"
        );
        observation
    }

    fn homography_for(&mut self, width: u32, height: u32) -> Option<Homography> {
        if let Some((w, h, cached)) = self.homography {
            if (w, h) == (width, height) {
                return Some(cached);
            }
        }
        let fitted = self.config.calibration.camera_to_ground(width, height)?;
        self.homography = Some((width, height, fitted));
        Some(fitted)
    }

    fn polar(&self, mask: &Mask) -> PolarSamples {
        let (bearings, ranges) = mask
            .set_pixels()
            .map(|(col, row)| {
                let p = RoverPoint::from_pixel(col, row, mask.width, mask.height);
                (p.bearing(), p.range())
            })
            .unzip();
        PolarSamples { bearings, ranges }
    }

    fn cells(&self, mask: &Mask, tf: &RoverToWorld) -> Vec<GridCell> {
        mask.set_pixels()
            .map(|(col, row)| {
                let p = RoverPoint::from_pixel(col, row, mask.width, mask.height);
                tf.to_cell(p, self.config.world_size)
            })
            .collect()
    }
}

/// Attitude angles arrive in `[0, 360)`; level is near 0 from either side.
fn is_level(angle_deg: f32, tolerance_deg: f32) -> bool {
    let a = angle_deg.rem_euclid(360.0);
    a <= tolerance_deg || a >= 360.0 - tolerance_deg
}
