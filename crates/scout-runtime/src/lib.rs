//! `scout-runtime` – runs the rover.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: one
//!   strictly sequenced perceive → decide → verify → act cycle per tick,
//!   either on the calling thread or pipelined across two tokio tasks.
//! - [`command_verifier`] – [`CommandVerifier`][command_verifier::CommandVerifier]:
//!   a rule engine that vetoes unsafe commands before they reach the drive
//!   base.
//! - [`event_sink`] – [`EventSink`][event_sink::EventSink] observability
//!   hooks for decision events: `tracing`, broadcast fan-out, or nothing.
//! - [`handoff`] – single-slot hand-off channel between pipeline stages.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod command_verifier;
pub mod control_loop;
pub mod event_sink;
pub mod handoff;
pub mod telemetry;

pub use command_verifier::{CommandVerifier, Rule};
pub use control_loop::{ControlLoop, MissionSummary, TickReport};
pub use event_sink::{BroadcastSink, EventSink, NullSink, TracingSink};
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};
