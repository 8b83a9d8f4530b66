//! Generic `DriveBase` trait for the rover's wheels, steering and sample arm.
//!
//! A drive base takes one [`ControlCommand`] per control tick and reports
//! the vehicle's current kinematic state as [`VehicleTelemetry`].  The rest
//! of the stack only ever talks to the trait, so drivers can be swapped
//! without touching decision logic.

use scout_types::{ControlCommand, ScoutError, VehicleTelemetry};

/// The rover's drivetrain plus pickup arm.
pub trait DriveBase: Send {
    /// Stable identifier for this drive base, e.g. `"rover_base"`.
    fn id(&self) -> &str;

    /// Most recent pose, speed and pickup status.
    fn telemetry(&self) -> VehicleTelemetry;

    /// Apply one tick's command.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::HardwareFault`] if the command cannot be applied
    /// (e.g. a motor controller is in a fault state).
    fn apply(&mut self, command: &ControlCommand) -> Result<(), ScoutError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process drive base used only for tests.
    struct MockDrive {
        telemetry: VehicleTelemetry,
        last: Option<ControlCommand>,
    }

    impl DriveBase for MockDrive {
        fn id(&self) -> &str {
            "mock_base"
        }

        fn telemetry(&self) -> VehicleTelemetry {
            self.telemetry
        }

        fn apply(&mut self, command: &ControlCommand) -> Result<(), ScoutError> {
            if command.brake > 0.0 {
                self.telemetry.velocity = 0.0;
            }
            self.last = Some(*command);
            Ok(())
        }
    }

    #[test]
    fn mock_drive_records_commands() {
        let mut drive = MockDrive {
            telemetry: VehicleTelemetry {
                velocity: 1.0,
                ..VehicleTelemetry::default()
            },
            last: None,
        };
        let cmd = ControlCommand {
            brake: 10.0,
            ..ControlCommand::default()
        };
        drive.apply(&cmd).unwrap();
        assert_eq!(drive.id(), "mock_base");
        assert_eq!(drive.last, Some(cmd));
        assert_eq!(drive.telemetry().velocity, 0.0);
    }
}
