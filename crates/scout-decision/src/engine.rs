//! The decision state machine.
//!
//! [`decide`] reads the observation fields and current mode of a
//! [`RoverState`] and writes throttle, brake, steer, pickup request and the
//! next mode.  It never fails and never logs: diagnostics are returned as
//! [`DecisionEvent`]s for the caller to route wherever it likes.
//!
//! # Modes
//!
//! | Mode | Behaviour |
//! |---|---|
//! | [`DriveMode::Forward`] | Stuck check, then cruise along the mean navigable bearing or acquire a target. |
//! | [`DriveMode::Stopped`] | Brake until halted, then hold for pickup, spin in place, or resume. |
//! | [`DriveMode::ApproachingTarget`] | Steer at the target, slowing down when close. |
//!
//! When perception produced nothing this tick the engine applies a safe
//! default (crawl straight ahead) and leaves the mode alone.
//!
//! # Example
//!
//! ```rust
//! use scout_decision::{decide, DecisionConfig};
//! use scout_types::{DriveMode, RoverState};
//!
//! let cfg = DecisionConfig { stop_threshold: 2, ..DecisionConfig::default() };
//! let mut state = RoverState::new();
//! state.navigable_bearings = Some(vec![-0.1, 0.0, 0.1]);
//! state.navigable_ranges = vec![10.0, 10.0, 10.0];
//! state.velocity = 1.0;
//!
//! let decision = decide(&mut state, &cfg);
//! assert_eq!(decision.command.mode, DriveMode::Forward);
//! assert!((decision.command.throttle - cfg.throttle_setting).abs() < 1e-6);
//! ```

use scout_types::{
    ControlCommand, DecisionEvent, DriveMode, Observation, RoverState, ScoutError,
    VehicleTelemetry,
};

use crate::config::DecisionConfig;

/// Result of one [`decide`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub command: ControlCommand,
    /// Diagnostics in the order they arose during the tick.
    pub events: Vec<DecisionEvent>,
}

/// Run one tick of the state machine against `state`.
pub fn decide(state: &mut RoverState, config: &DecisionConfig) -> Decision {
    let entry_mode = state.mode;
    let mut events = Vec::new();

    if state.navigable_bearings.is_none() {
        state.throttle_cmd = config.throttle_setting;
        state.steer_cmd = 0.0;
        state.brake_cmd = 0.0;
        events.push(DecisionEvent::ObservationMissing);
    } else {
        match state.mode {
            DriveMode::Forward => forward(state, config, &mut events),
            DriveMode::Stopped => stopped(state, config),
            DriveMode::ApproachingTarget => approaching(state, config, &mut events),
        }
    }

    state.pickup_requested = state.near_sample && state.velocity == 0.0 && !state.is_picking_up;
    if state.pickup_requested {
        events.push(DecisionEvent::PickupRequested);
    }

    enforce_output_invariants(state, config);

    if state.mode != entry_mode {
        events.push(DecisionEvent::ModeChanged {
            from: entry_mode,
            to: state.mode,
        });
    }

    Decision {
        command: state.command(),
        events,
    }
}

fn forward(state: &mut RoverState, config: &DecisionConfig, events: &mut Vec<DecisionEvent>) {
    // Must precede the governor: a stuck rover brakes even with open terrain.
    if state.steer_cmd.abs() > config.stuck_steer_threshold && state.velocity == 0.0 {
        events.push(DecisionEvent::StuckDetected {
            steer: state.steer_cmd,
        });
        state.stuck_flag = true;
        brake_to_stop(state, config);
        return;
    }

    if !has_navigable(state, config.stop_threshold) {
        brake_to_stop(state, config);
        return;
    }

    state.stuck_flag = false;
    state.throttle_cmd = governed_throttle(state, config, config.throttle_setting);
    state.brake_cmd = 0.0;

    match target_in_range(state, config) {
        // Steering toward the target starts next tick.
        Some(range) => {
            events.push(DecisionEvent::TargetAcquired { range });
            state.mode = DriveMode::ApproachingTarget;
        }
        None => state.steer_cmd = navigable_steer(state, config),
    }
}

fn stopped(state: &mut RoverState, config: &DecisionConfig) {
    if state.velocity > config.halted_velocity {
        hold_brake(state, config);
        return;
    }

    let can_resume = has_navigable(state, config.resume_threshold);

    if state.target_visible && state.near_sample {
        hold_brake(state, config);
    } else if state.stuck_flag || !can_resume {
        state.throttle_cmd = 0.0;
        state.brake_cmd = 0.0;
        state.steer_cmd = config.recovery_steer;
    }

    // Evaluated after the branch above and overrides it (last write wins).
    if can_resume {
        state.throttle_cmd = config.throttle_setting;
        state.brake_cmd = 0.0;
        state.steer_cmd = navigable_steer(state, config);
        state.mode = DriveMode::Forward;
    }
}

fn approaching(state: &mut RoverState, config: &DecisionConfig, events: &mut Vec<DecisionEvent>) {
    if state.near_sample {
        // Arrived; Stopped handles braking and the pickup hold from next tick.
        state.mode = DriveMode::Stopped;
        return;
    }

    let Some(range) = target_in_range(state, config) else {
        events.push(DecisionEvent::TargetLost);
        state.mode = DriveMode::Forward;
        return;
    };

    if !has_navigable(state, config.stop_threshold) {
        brake_to_stop(state, config);
        return;
    }

    // Stalled short of the target.  `stuck_flag` stays a Forward-only latch.
    if state.velocity == 0.0 {
        events.push(DecisionEvent::StuckDetected {
            steer: state.steer_cmd,
        });
        brake_to_stop(state, config);
        return;
    }

    let throttle = if range <= config.slow_approach_range {
        config.slow_approach_throttle
    } else {
        config.throttle_setting
    };
    state.throttle_cmd = governed_throttle(state, config, throttle);
    state.brake_cmd = 0.0;
    state.steer_cmd = clip_steer(mean(&state.target_bearings).to_degrees(), config);
}

/// Zero throttle, full brake, wheels straight, and enter Stopped.
fn brake_to_stop(state: &mut RoverState, config: &DecisionConfig) {
    hold_brake(state, config);
    state.mode = DriveMode::Stopped;
}

fn hold_brake(state: &mut RoverState, config: &DecisionConfig) {
    state.throttle_cmd = 0.0;
    state.brake_cmd = config.brake_setting;
    state.steer_cmd = 0.0;
}

/// `throttle` below the speed cap, coast above it.
fn governed_throttle(state: &RoverState, config: &DecisionConfig, throttle: f32) -> f32 {
    if state.velocity < config.max_velocity {
        throttle
    } else {
        0.0
    }
}

/// `true` when the navigable cloud is non-empty and holds at least
/// `threshold` samples.  An empty cloud never counts as sufficient, so no
/// mean is ever taken over it.
fn has_navigable(state: &RoverState, threshold: usize) -> bool {
    let count = state.navigable_count();
    count > 0 && count >= threshold
}

/// Mean target range when a target is visible and within acquisition range.
fn target_in_range(state: &RoverState, config: &DecisionConfig) -> Option<f32> {
    if !state.target_visible || state.target_ranges.is_empty() || state.target_bearings.is_empty() {
        return None;
    }
    let range = mean(&state.target_ranges);
    (range <= config.target_acquisition_range).then_some(range)
}

fn navigable_steer(state: &RoverState, config: &DecisionConfig) -> f32 {
    let bearings = state.navigable_bearings.as_deref().unwrap_or_default();
    clip_steer(mean(bearings).to_degrees(), config)
}

fn clip_steer(steer_deg: f32, config: &DecisionConfig) -> f32 {
    steer_deg.clamp(-config.max_steer, config.max_steer)
}

fn mean(values: &[f32]) -> f32 {
    debug_assert!(!values.is_empty(), "mean taken over an empty sequence");
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Steering stays in range and braking releases throttle, whatever the
/// state held on entry.
fn enforce_output_invariants(state: &mut RoverState, config: &DecisionConfig) {
    state.steer_cmd = if state.steer_cmd.is_finite() {
        clip_steer(state.steer_cmd, config)
    } else {
        0.0
    };
    if state.brake_cmd > 0.0 {
        state.throttle_cmd = 0.0;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecisionEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the rover state and configuration for a mission and exposes the
/// per-tick `step` entry point.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    state: RoverState,
    config: DecisionConfig,
}

impl DecisionEngine {
    /// Create an engine in [`DriveMode::Forward`] with a fresh state.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: DecisionConfig) -> Result<Self, ScoutError> {
        config.validate()?;
        Ok(Self {
            state: RoverState::new(),
            config,
        })
    }

    pub fn state(&self) -> &RoverState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RoverState {
        &mut self.state
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Ingest this tick's telemetry and observation, then decide.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::ObservationMismatch`] when the observation
    /// breaks the parallel-sequence contract.  Nothing is mutated then.
    pub fn step(
        &mut self,
        telemetry: &VehicleTelemetry,
        observation: &Observation,
    ) -> Result<Decision, ScoutError> {
        self.state.apply_observation(observation)?;
        self.state.apply_telemetry(telemetry);
        Ok(decide(&mut self.state, &self.config))
    }
}
