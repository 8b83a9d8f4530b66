//! `scout-decision` – the rover's reactive driving policy.
//!
//! Turns frame-by-frame terrain and target observations into stable
//! throttle, brake and steering commands.
//!
//! # Modules
//!
//! - [`config`] – [`DecisionConfig`][config::DecisionConfig]: thresholds and
//!   actuator settings supplied once at mission start.
//! - [`engine`] – [`decide`][engine::decide]: the Forward / Stopped /
//!   ApproachingTarget state machine, and
//!   [`DecisionEngine`][engine::DecisionEngine], which owns a
//!   [`RoverState`][scout_types::RoverState] and exposes the per-tick `step`.
//!
//! The engine is pure: no I/O, no logging.  Every diagnostic comes back as a
//! [`DecisionEvent`][scout_types::DecisionEvent] in the returned
//! [`Decision`][engine::Decision].

pub mod config;
pub mod engine;

pub use config::DecisionConfig;
pub use engine::{decide, Decision, DecisionEngine};
