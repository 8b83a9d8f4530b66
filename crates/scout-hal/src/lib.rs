//! `scout-hal` – hardware abstraction for the rover.
//!
//! # Modules
//!
//! - [`camera`] – the [`Camera`][camera::Camera] trait for the front camera.
//! - [`actuator`] – the [`DriveBase`][actuator::DriveBase] trait for the
//!   drivetrain and sample arm.
//! - [`sim`] – [`SimRig`][sim::SimRig]: an in-process simulated world with
//!   camera and drive drivers, for headless missions and CI.

pub mod actuator;
pub mod camera;
pub mod sim;

pub use actuator::DriveBase;
pub use camera::Camera;
