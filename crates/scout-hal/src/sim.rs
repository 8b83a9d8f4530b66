//! In-process rover simulator for headless missions and tests.
//!
//! A [`SimWorld`] is a flat square arena of sand with dark boulders and
//! yellow rock samples.  [`SimRig`] builds one, shares it behind an
//! `Arc<Mutex<_>>`, and hands out the two drivers the control loop needs:
//!
//! | Driver | Behaviour |
//! |---|---|
//! | [`SimCamera`] | Renders the ground ahead of the rover through the same ground homography perception inverts. |
//! | [`SimDrive`]  | Advances the kinematics by one time step per applied command and runs the pickup arm. |
//!
//! # Example
//!
//! ```rust
//! use scout_hal::actuator::DriveBase;
//! use scout_hal::sim::SimRig;
//! use scout_types::ControlCommand;
//!
//! let mut rig = SimRig::new().with_sample(110.0, 100.0).build();
//! rig.drive
//!     .apply(&ControlCommand { throttle: 0.2, ..ControlCommand::default() })
//!     .expect("sim drive must succeed");
//! assert!(rig.drive.telemetry().velocity > 0.0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scout_perception::transform::{RoverPoint, RoverToWorld, DEFAULT_SCALE};
use scout_perception::warp::{GroundCalibration, Homography};
use scout_types::{CameraFrame, ControlCommand, Pose, ScoutError, VehicleTelemetry};
use tracing::{debug, info};

/// Camera frame size of the simulated rover.
pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 160;

const SAND: [u8; 3] = [210, 195, 170];
const ROCK_WALL: [u8; 3] = [70, 60, 55];
const SAMPLE: [u8; 3] = [220, 190, 20];
const SKY: [u8; 3] = [40, 40, 60];

/// Velocities below this snap to exactly zero.
const REST_SPEED: f32 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// Physical constants of the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Side of the square arena in map cells (metres).
    pub arena_size: f32,
    /// Seconds advanced per applied command.
    pub dt: f32,
    /// m/s² per unit of throttle.
    pub accel_per_throttle: f32,
    /// m/s² per unit of brake.
    pub decel_per_brake: f32,
    /// Fraction of speed lost per second when coasting.
    pub drag: f32,
    /// Yaw rate in deg/s per degree of steer.  Skid steering, so the rover
    /// turns in place too.
    pub turn_rate: f32,
    /// Radius of a rock sample on the ground.
    pub sample_radius: f32,
    /// Distance at which a sample is within reach of the arm.
    pub pickup_radius: f32,
    /// Ticks a pickup takes.
    pub pickup_ticks: u32,
    /// Camera view distance, in rover-frame pixels.
    pub view_range: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_size: 200.0,
            dt: 0.1,
            accel_per_throttle: 5.0,
            decel_per_brake: 2.0,
            drag: 0.2,
            turn_rate: 3.0,
            sample_radius: 0.5,
            pickup_radius: 2.0,
            pickup_ticks: 10,
            view_range: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Boulder {
    x: f32,
    y: f32,
    radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terrain {
    Sand,
    Wall,
    Sample,
}

/// Simulated terrain plus rover kinematics.
#[derive(Debug, Clone)]
pub struct SimWorld {
    config: SimConfig,
    pose: Pose,
    velocity: f32,
    boulders: Vec<Boulder>,
    samples: Vec<(f32, f32)>,
    pickup_remaining: u32,
    samples_collected: u32,
}

impl SimWorld {
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Rock samples still lying in the arena.
    pub fn samples_remaining(&self) -> usize {
        self.samples.len()
    }

    /// Tilt the rover, e.g. to emulate driving over a ridge.
    pub fn set_attitude(&mut self, pitch_deg: f32, roll_deg: f32) {
        self.pose.pitch_deg = pitch_deg;
        self.pose.roll_deg = roll_deg;
    }

    pub fn telemetry(&self) -> VehicleTelemetry {
        VehicleTelemetry {
            pose: self.pose,
            velocity: self.velocity,
            near_sample: self.nearest_sample_in_reach().is_some(),
            is_picking_up: self.pickup_remaining > 0,
            samples_collected: self.samples_collected,
        }
    }

    /// Advance the world by one time step under `command`.
    pub fn step(&mut self, command: &ControlCommand) {
        if self.pickup_remaining > 0 {
            self.velocity = 0.0;
            self.pickup_remaining -= 1;
            if self.pickup_remaining == 0 {
                self.finish_pickup();
            }
            return;
        }

        if command.pickup_requested && self.velocity == 0.0 {
            if self.nearest_sample_in_reach().is_some() {
                debug!("pickup started");
                self.pickup_remaining = self.config.pickup_ticks;
                return;
            }
            debug!("pickup requested with no sample in reach; ignored");
        }

        let dt = self.config.dt;
        if command.brake > 0.0 {
            self.velocity -= command.brake * self.config.decel_per_brake * dt;
        } else {
            self.velocity += command.throttle * self.config.accel_per_throttle * dt;
            self.velocity -= self.velocity * self.config.drag * dt;
        }
        if self.velocity < REST_SPEED {
            self.velocity = 0.0;
        }

        self.pose.yaw_deg =
            (self.pose.yaw_deg + command.steer * self.config.turn_rate * dt).rem_euclid(360.0);

        let (sin, cos) = self.pose.yaw_deg.to_radians().sin_cos();
        let next_x = self.pose.x + self.velocity * cos * dt;
        let next_y = self.pose.y + self.velocity * sin * dt;
        if self.blocked(next_x, next_y) {
            self.velocity = 0.0;
        } else {
            self.pose.x = next_x;
            self.pose.y = next_y;
        }
    }

    fn finish_pickup(&mut self) {
        if let Some(i) = self.nearest_sample_in_reach() {
            self.samples.swap_remove(i);
            self.samples_collected += 1;
            info!(collected = self.samples_collected, "rock sample collected");
        }
    }

    fn nearest_sample_in_reach(&self) -> Option<usize> {
        let (x, y) = (self.pose.x, self.pose.y);
        self.samples
            .iter()
            .enumerate()
            .map(|(i, (sx, sy))| (i, (sx - x).hypot(sy - y)))
            .filter(|(_, d)| *d <= self.config.pickup_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    fn blocked(&self, x: f32, y: f32) -> bool {
        self.terrain(x, y) == Terrain::Wall
    }

    fn terrain(&self, x: f32, y: f32) -> Terrain {
        let max = self.config.arena_size - 1.0;
        if !(1.0..=max).contains(&x) || !(1.0..=max).contains(&y) {
            return Terrain::Wall;
        }
        if self
            .boulders
            .iter()
            .any(|b| (b.x - x).hypot(b.y - y) < b.radius)
        {
            return Terrain::Wall;
        }
        if self
            .samples
            .iter()
            .any(|(sx, sy)| (sx - x).hypot(sy - y) < self.config.sample_radius)
        {
            return Terrain::Sample;
        }
        Terrain::Sand
    }
}

/// A world shared between the simulated drivers.
pub type SharedWorld = Arc<Mutex<SimWorld>>;

fn lock(world: &SharedWorld) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Drivers
// ────────────────────────────────────────────────────────────────────────────

/// A simulated front camera.
pub struct SimCamera {
    id: String,
    world: SharedWorld,
    /// Camera image to top-down image.
    ground: Option<Homography>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, world: SharedWorld) -> Self {
        Self {
            id: id.into(),
            world,
            ground: GroundCalibration::default().camera_to_ground(FRAME_WIDTH, FRAME_HEIGHT),
        }
    }
}

impl crate::camera::Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, ScoutError> {
        let ground = self.ground.ok_or_else(|| ScoutError::HardwareFault {
            component: self.id.clone(),
            details: "ground calibration is degenerate".to_string(),
        })?;
        let world = lock(&self.world);
        let pose = world.pose;
        let tf = RoverToWorld::new(pose.x, pose.y, pose.yaw_deg).with_scale(DEFAULT_SCALE);

        let mut frame = CameraFrame::filled(FRAME_WIDTH, FRAME_HEIGHT, SKY);
        for row in 0..FRAME_HEIGHT {
            for col in 0..FRAME_WIDTH {
                let Some((u, v)) = ground.apply(col as f32, row as f32) else {
                    continue;
                };
                let ahead = RoverPoint::from_image(u, v, FRAME_WIDTH, FRAME_HEIGHT);
                // Points at or behind the horizon come back with x <= 0.
                if ahead.x <= 0.0 || ahead.range() > world.config.view_range {
                    continue;
                }
                let p = tf.apply(ahead);
                let rgb = match world.terrain(p.x, p.y) {
                    Terrain::Sand => SAND,
                    Terrain::Wall => ROCK_WALL,
                    Terrain::Sample => SAMPLE,
                };
                frame.set_pixel(col, row, rgb);
            }
        }
        Ok(frame)
    }
}

/// A simulated drive base moving the rover through the shared world.
pub struct SimDrive {
    id: String,
    world: SharedWorld,
}

impl SimDrive {
    pub fn new(id: impl Into<String>, world: SharedWorld) -> Self {
        Self {
            id: id.into(),
            world,
        }
    }
}

impl crate::actuator::DriveBase for SimDrive {
    fn id(&self) -> &str {
        &self.id
    }

    fn telemetry(&self) -> VehicleTelemetry {
        lock(&self.world).telemetry()
    }

    fn apply(&mut self, command: &ControlCommand) -> Result<(), ScoutError> {
        lock(&self.world).step(command);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRig builder
// ────────────────────────────────────────────────────────────────────────────

/// A built simulator: the shared world plus its two drivers.
pub struct SimHardware {
    pub world: SharedWorld,
    pub camera: SimCamera,
    pub drive: SimDrive,
}

/// Builder for a [`SimHardware`].
///
/// The rover starts at the arena centre facing `+x` unless
/// [`with_start`][Self::with_start] says otherwise.
#[derive(Debug, Clone)]
pub struct SimRig {
    config: SimConfig,
    start: Pose,
    boulders: Vec<Boulder>,
    samples: Vec<(f32, f32)>,
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRig {
    pub fn new() -> Self {
        let config = SimConfig::default();
        Self {
            start: Pose {
                x: config.arena_size / 2.0,
                y: config.arena_size / 2.0,
                ..Pose::default()
            },
            config,
            boulders: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_start(mut self, pose: Pose) -> Self {
        self.start = pose;
        self
    }

    pub fn with_boulder(mut self, x: f32, y: f32, radius: f32) -> Self {
        self.boulders.push(Boulder { x, y, radius });
        self
    }

    pub fn with_sample(mut self, x: f32, y: f32) -> Self {
        self.samples.push((x, y));
        self
    }

    /// Scatter `count` samples on rings around the start position.
    pub fn with_sample_ring(mut self, count: usize) -> Self {
        let max = self.config.arena_size - 2.0;
        for i in 0..count {
            let angle = (20.0 + i as f32 * 360.0 / count as f32).to_radians();
            let radius = 12.0 + 6.0 * (i % 3) as f32;
            let x = (self.start.x + radius * angle.cos()).clamp(2.0, max);
            let y = (self.start.y + radius * angle.sin()).clamp(2.0, max);
            self.samples.push((x, y));
        }
        self
    }

    /// A default mission field: `samples` samples and a handful of boulders.
    pub fn mission(samples: usize) -> Self {
        let rig = Self::new();
        let (cx, cy) = (rig.start.x, rig.start.y);
        rig.with_boulder(cx + 25.0, cy + 4.0, 3.0)
            .with_boulder(cx - 18.0, cy - 15.0, 4.0)
            .with_boulder(cx + 5.0, cy - 28.0, 2.5)
            .with_boulder(cx - 30.0, cy + 20.0, 5.0)
            .with_sample_ring(samples)
    }

    pub fn build(self) -> SimHardware {
        let world = Arc::new(Mutex::new(SimWorld {
            config: self.config,
            pose: self.start,
            velocity: 0.0,
            boulders: self.boulders,
            samples: self.samples,
            pickup_remaining: 0,
            samples_collected: 0,
        }));
        SimHardware {
            camera: SimCamera::new("front_rgb", Arc::clone(&world)),
            drive: SimDrive::new("rover_base", Arc::clone(&world)),
            world,
        }
    }
}
