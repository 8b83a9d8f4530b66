//! Constants supplied to the decision engine at mission start.

use scout_types::ScoutError;
use serde::{Deserialize, Serialize};

/// Tuning surface of the decision engine.  Loaded once, never re-derived.
///
/// Every field has a serde default so a partial `[decision]` table in a TOML
/// file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Forward speed above which the governor coasts.
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f32,

    /// Throttle applied when accelerating.
    #[serde(default = "default_throttle_setting")]
    pub throttle_setting: f32,

    /// Brake applied when stopping.
    #[serde(default = "default_brake_setting")]
    pub brake_setting: f32,

    /// Minimum navigable samples needed to stay in Forward.
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: usize,

    /// Minimum navigable samples needed to leave Stopped.
    #[serde(default = "default_resume_threshold")]
    pub resume_threshold: usize,

    /// Mean target range at or below which a sample is pursued.
    #[serde(default = "default_target_acquisition_range")]
    pub target_acquisition_range: f32,

    /// Mean target range at or below which the approach slows down.
    #[serde(default = "default_slow_approach_range")]
    pub slow_approach_range: f32,

    #[serde(default = "default_slow_approach_throttle")]
    pub slow_approach_throttle: f32,

    /// `|steer|` above which a stationary rover in Forward counts as stuck.
    #[serde(default = "default_stuck_steer_threshold")]
    pub stuck_steer_threshold: f32,

    /// Speed at or below which the rover counts as halted.
    #[serde(default = "default_halted_velocity")]
    pub halted_velocity: f32,

    /// Steering limit in degrees, symmetric.
    #[serde(default = "default_max_steer")]
    pub max_steer: f32,

    /// Steering used for the in-place recovery turn.
    #[serde(default = "default_recovery_steer")]
    pub recovery_steer: f32,
}

fn default_max_velocity() -> f32 {
    2.0
}
fn default_throttle_setting() -> f32 {
    0.2
}
fn default_brake_setting() -> f32 {
    10.0
}
fn default_stop_threshold() -> usize {
    50
}
fn default_resume_threshold() -> usize {
    500
}
fn default_target_acquisition_range() -> f32 {
    200.0
}
fn default_slow_approach_range() -> f32 {
    60.0
}
fn default_slow_approach_throttle() -> f32 {
    0.15
}
fn default_stuck_steer_threshold() -> f32 {
    10.0
}
fn default_halted_velocity() -> f32 {
    0.2
}
fn default_max_steer() -> f32 {
    15.0
}
fn default_recovery_steer() -> f32 {
    -15.0
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            max_velocity: default_max_velocity(),
            throttle_setting: default_throttle_setting(),
            brake_setting: default_brake_setting(),
            stop_threshold: default_stop_threshold(),
            resume_threshold: default_resume_threshold(),
            target_acquisition_range: default_target_acquisition_range(),
            slow_approach_range: default_slow_approach_range(),
            slow_approach_throttle: default_slow_approach_throttle(),
            stuck_steer_threshold: default_stuck_steer_threshold(),
            halted_velocity: default_halted_velocity(),
            max_steer: default_max_steer(),
            recovery_steer: default_recovery_steer(),
        }
    }
}

impl DecisionConfig {
    /// Check the configuration is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ScoutError> {
        let non_negative = [
            ("max_velocity", self.max_velocity),
            ("throttle_setting", self.throttle_setting),
            ("brake_setting", self.brake_setting),
            ("target_acquisition_range", self.target_acquisition_range),
            ("slow_approach_range", self.slow_approach_range),
            ("slow_approach_throttle", self.slow_approach_throttle),
            ("stuck_steer_threshold", self.stuck_steer_threshold),
            ("halted_velocity", self.halted_velocity),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoutError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if !self.max_steer.is_finite() || self.max_steer <= 0.0 {
            return Err(ScoutError::InvalidConfig(format!(
                "max_steer must be positive (got {})",
                self.max_steer
            )));
        }
        if !self.recovery_steer.is_finite() || self.recovery_steer.abs() > self.max_steer {
            return Err(ScoutError::InvalidConfig(format!(
                "recovery_steer {} exceeds the ±{} steering range",
                self.recovery_steer, self.max_steer
            )));
        }
        // Stuck detection can only fire if steering can exceed the threshold.
        if self.stuck_steer_threshold >= self.max_steer {
            return Err(ScoutError::InvalidConfig(format!(
                "stuck_steer_threshold {} must be below max_steer {}",
                self.stuck_steer_threshold, self.max_steer
            )));
        }
        if self.slow_approach_range > self.target_acquisition_range {
            return Err(ScoutError::InvalidConfig(format!(
                "slow_approach_range {} exceeds target_acquisition_range {}",
                self.slow_approach_range, self.target_acquisition_range
            )));
        }
        Ok(())
    }
}
