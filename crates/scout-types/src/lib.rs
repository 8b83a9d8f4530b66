use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Behavioral state of the rover.  Transitions happen only inside the
/// decision engine; perception never writes this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Cruise along the mean navigable bearing.
    #[default]
    Forward,
    /// Brake to a halt, then either hold, spin in place, or resume.
    Stopped,
    /// Steer toward a detected rock sample.
    ApproachingTarget,
}

impl std::fmt::Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMode::Forward => write!(f, "forward"),
            DriveMode::Stopped => write!(f, "stopped"),
            DriveMode::ApproachingTarget => write!(f, "approaching_target"),
        }
    }
}

/// Rover pose as reported by the simulator.
///
/// `x`/`y` are world-map cells; attitude angles are degrees in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub roll_deg: f32,
}

/// Vehicle-side readings sampled once per tick before perception runs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    pub pose: Pose,
    /// Signed, forward-positive.
    pub velocity: f32,
    /// Proximity sensor: the rover is adjacent to a collectible sample.
    pub near_sample: bool,
    /// A pickup action is in progress on the arm.
    pub is_picking_up: bool,
    pub samples_collected: u32,
}

/// A parallel bearing/range point cloud in rover-centric polar coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarSamples {
    /// Radians, positive to the left of the rover heading.
    pub bearings: Vec<f32>,
    /// Distances in rover-frame pixels.
    pub ranges: Vec<f32>,
}

impl PolarSamples {
    pub fn new(bearings: Vec<f32>, ranges: Vec<f32>) -> Self {
        Self { bearings, ranges }
    }

    pub fn len(&self) -> usize {
        self.bearings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bearings.is_empty()
    }
}

/// A single world-map cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: u16,
    pub y: u16,
}

/// World cells classified by one frame, per layer.  Opaque to the decision
/// engine; consumed by the world map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapDelta {
    pub obstacles: Vec<GridCell>,
    pub rocks: Vec<GridCell>,
    pub navigable: Vec<GridCell>,
}

impl MapDelta {
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty() && self.rocks.is_empty() && self.navigable.is_empty()
    }
}

/// Output of the perception adapter for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// `None` when the frame was skipped (attitude out of tolerance or a
    /// malformed frame).  An empty cloud is a valid, distinct observation.
    pub navigable: Option<PolarSamples>,
    /// `None` when no rock sample pixel was detected.
    pub target: Option<PolarSamples>,
    pub map_delta: MapDelta,
}

impl Observation {
    /// The observation produced when perception ran no computation.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// A raw RGB24 camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row-major RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self { width, height, data }
    }

    /// `true` when `data` holds exactly `width * height` RGB triples.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(p) = self.data.get_mut(i..i + 3) {
            p.copy_from_slice(&rgb);
        }
    }
}

/// Actuator commands for one tick, plus the mode the engine ended the tick in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlCommand {
    pub throttle: f32,
    /// Always `>= 0`.
    pub brake: f32,
    /// Degrees, clamped to the configured steering range.
    pub steer: f32,
    /// One-shot edge; the consumer issues the pickup and clears it.
    pub pickup_requested: bool,
    pub mode: DriveMode,
}

/// The single mutable record the control loop owns.
///
/// Configured constants (thresholds, throttle/brake settings) live in the
/// decision configuration; everything here is overwritten tick by tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoverState {
    pub mode: DriveMode,
    pub pose: Pose,
    pub velocity: f32,

    pub navigable_bearings: Option<Vec<f32>>,
    pub navigable_ranges: Vec<f32>,
    pub target_visible: bool,
    pub target_bearings: Vec<f32>,
    pub target_ranges: Vec<f32>,

    pub near_sample: bool,
    pub stuck_flag: bool,
    pub is_picking_up: bool,

    pub throttle_cmd: f32,
    pub brake_cmd: f32,
    pub steer_cmd: f32,
    pub pickup_requested: bool,

    pub samples_collected: u32,
}

impl RoverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of navigable samples observed this tick; zero when absent.
    pub fn navigable_count(&self) -> usize {
        self.navigable_bearings.as_ref().map_or(0, Vec::len)
    }

    /// Copy vehicle-side readings into the state.
    pub fn apply_telemetry(&mut self, telemetry: &VehicleTelemetry) {
        self.pose = telemetry.pose;
        self.velocity = telemetry.velocity;
        self.near_sample = telemetry.near_sample;
        self.is_picking_up = telemetry.is_picking_up;
        self.samples_collected = telemetry.samples_collected;
    }

    /// Write this tick's perception output into the observation fields.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::ObservationMismatch`] when a bearing sequence and
    /// its range sequence differ in length.  The state is left untouched.
    pub fn apply_observation(&mut self, observation: &Observation) -> Result<(), ScoutError> {
        if let Some(nav) = &observation.navigable {
            check_parallel("navigable", nav)?;
        }
        if let Some(target) = &observation.target {
            check_parallel("target", target)?;
        }

        match &observation.navigable {
            Some(nav) => {
                self.navigable_bearings = Some(nav.bearings.clone());
                self.navigable_ranges = nav.ranges.clone();
            }
            None => {
                self.navigable_bearings = None;
                self.navigable_ranges.clear();
            }
        }
        match &observation.target {
            Some(target) => {
                self.target_visible = true;
                self.target_bearings = target.bearings.clone();
                self.target_ranges = target.ranges.clone();
            }
            None => {
                self.target_visible = false;
                self.target_bearings.clear();
                self.target_ranges.clear();
            }
        }
        Ok(())
    }

    /// Snapshot of the control outputs.
    pub fn command(&self) -> ControlCommand {
        ControlCommand {
            throttle: self.throttle_cmd,
            brake: self.brake_cmd,
            steer: self.steer_cmd,
            pickup_requested: self.pickup_requested,
            mode: self.mode,
        }
    }
}

fn check_parallel(layer: &'static str, samples: &PolarSamples) -> Result<(), ScoutError> {
    if samples.bearings.len() != samples.ranges.len() {
        return Err(ScoutError::ObservationMismatch {
            layer: layer.to_string(),
            bearings: samples.bearings.len(),
            ranges: samples.ranges.len(),
        });
    }
    Ok(())
}

/// Structured diagnostics produced by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum DecisionEvent {
    ModeChanged { from: DriveMode, to: DriveMode },
    /// Stationary when the rover should be moving: steering saturated in
    /// Forward, or stalled while approaching a target.  Only the Forward
    /// case latches `RoverState::stuck_flag`.
    StuckDetected { steer: f32 },
    /// A sample came within acquisition range; `range` is the mean pixel range.
    TargetAcquired { range: f32 },
    TargetLost,
    /// Perception produced nothing this tick; the safe default was applied.
    ObservationMissing,
    PickupRequested,
}

/// Envelope routed to event sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub id: Uuid,
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: DecisionEvent,
}

impl MissionEvent {
    pub fn new(tick: u64, payload: DecisionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            tick,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Errors surfaced by the scout stack.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoutError {
    #[error("Perception contract violation on {layer}: {bearings} bearings vs {ranges} ranges")]
    ObservationMismatch {
        layer: String,
        bearings: usize,
        ranges: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command rejected by {rule}: {details}")]
    CommandRejected { rule: String, details: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Channel Error: {0}")]
    Channel(String),
}
