//! [`CommandVerifier`] – last line of defence before a command reaches the
//! drive base.
//!
//! Every registered [`Rule`] is evaluated in order against the command and
//! the telemetry it was decided on; the first violation returns
//! [`ScoutError::CommandRejected`] and the command is **not** applied.
//!
//! Built-in rules:
//! - [`SteerRangeRule`] – steer must be finite and within `±max_steer`.
//! - [`ThrottleBrakeExclusiveRule`] – never throttle and brake together.
//! - [`PickupWhileMovingRule`] – the arm only deploys when the rover is halted.

use scout_types::{ControlCommand, ScoutError, VehicleTelemetry};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single physical invariant that a command must satisfy.
pub trait Rule: Send + Sync {
    /// Name used in rejection errors.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `command` satisfies the invariant.
    fn check(&self, command: &ControlCommand, telemetry: &VehicleTelemetry)
    -> Result<(), String>;
}

// ────────────────────────────────────────────────────────────────────────────
// CommandVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine validating a [`ControlCommand`] before dispatch.
///
/// # Example
///
/// ```
/// use scout_runtime::command_verifier::{CommandVerifier, SteerRangeRule};
/// use scout_types::{ControlCommand, VehicleTelemetry};
///
/// let mut verifier = CommandVerifier::new();
/// verifier.add_rule(Box::new(SteerRangeRule { max_steer: 15.0 }));
///
/// let telemetry = VehicleTelemetry::default();
/// let ok = ControlCommand { steer: 12.0, ..ControlCommand::default() };
/// assert!(verifier.verify(&ok, &telemetry).is_ok());
///
/// let hard_over = ControlCommand { steer: 40.0, ..ControlCommand::default() };
/// assert!(verifier.verify(&hard_over, &telemetry).is_err());
/// ```
#[derive(Default)]
pub struct CommandVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl CommandVerifier {
    /// Create an empty verifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// A verifier loaded with all built-in rules.
    pub fn with_builtin_rules(max_steer: f32) -> Self {
        let mut verifier = Self::new();
        verifier.add_rule(Box::new(SteerRangeRule { max_steer }));
        verifier.add_rule(Box::new(ThrottleBrakeExclusiveRule));
        verifier.add_rule(Box::new(PickupWhileMovingRule));
        verifier
    }

    /// Register a new [`Rule`].  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `command` against every registered rule.
    pub fn verify(
        &self,
        command: &ControlCommand,
        telemetry: &VehicleTelemetry,
    ) -> Result<(), ScoutError> {
        for rule in &self.rules {
            rule.check(command, telemetry)
                .map_err(|details| ScoutError::CommandRejected {
                    rule: rule.name().to_string(),
                    details,
                })?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects non-finite steering or steering beyond `±max_steer` degrees.
pub struct SteerRangeRule {
    pub max_steer: f32,
}

impl Rule for SteerRangeRule {
    fn name(&self) -> &str {
        "steer_range"
    }

    fn check(&self, command: &ControlCommand, _: &VehicleTelemetry) -> Result<(), String> {
        if !command.steer.is_finite() || command.steer.abs() > self.max_steer {
            return Err(format!(
                "steer {} outside [-{max}, {max}]",
                command.steer,
                max = self.max_steer
            ));
        }
        Ok(())
    }
}

/// Rejects commands that throttle and brake at the same time.
pub struct ThrottleBrakeExclusiveRule;

impl Rule for ThrottleBrakeExclusiveRule {
    fn name(&self) -> &str {
        "throttle_brake_exclusive"
    }

    fn check(&self, command: &ControlCommand, _: &VehicleTelemetry) -> Result<(), String> {
        if command.throttle > 0.0 && command.brake > 0.0 {
            return Err(format!(
                "throttle {} with brake {}",
                command.throttle, command.brake
            ));
        }
        Ok(())
    }
}

/// Rejects a pickup request while the rover is still rolling.
pub struct PickupWhileMovingRule;

impl Rule for PickupWhileMovingRule {
    fn name(&self) -> &str {
        "pickup_while_moving"
    }

    fn check(&self, command: &ControlCommand, telemetry: &VehicleTelemetry) -> Result<(), String> {
        if command.pickup_requested && telemetry.velocity != 0.0 {
            return Err(format!("pickup requested at velocity {}", telemetry.velocity));
        }
        Ok(())
    }
}
