//! `scout-perception` – turns the rover's front camera into something the
//! decision engine can steer by.
//!
//! # Modules
//!
//! - [`warp`] – [`Homography`][warp::Homography] fitting and the
//!   perspective warp from the camera view to a top-down view.
//! - [`classify`] – colour thresholding of top-down pixels into rock,
//!   obstacle and navigable [`Mask`][classify::Mask]s.
//! - [`transform`] – rover-frame polar coordinates and the
//!   [`RoverToWorld`][transform::RoverToWorld] map projection.
//! - [`world_map`] – [`WorldMap`][world_map::WorldMap]: per-layer hit
//!   counters over the explored terrain.
//! - [`adapter`] – [`PerceptionAdapter`][adapter::PerceptionAdapter]: the
//!   whole pipeline, one frame in and one `Observation` out.

pub mod adapter;
pub mod classify;
pub mod transform;
pub mod warp;
pub mod world_map;

pub use adapter::{PerceptionAdapter, PerceptionConfig};
pub use world_map::WorldMap;
