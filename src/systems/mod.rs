//! Overlay systems.
//!
//! This module groups the ECS systems that advance time, keep the spatial
//! index current, expire pulses, and drive the overlay render pass.
//!
//! Submodules overview
//! - [`overlays`] – run every overlay against a viewport and tear them down
//! - [`radiationpulse`] – despawn pulses whose time window has ended
//! - [`spatialindex`] – rebuild [`crate::resources::spatialindex::SpatialIndex`] from positions
//! - [`time`] – update simulation time and delta

pub mod overlays;
pub mod radiationpulse;
pub mod spatialindex;
pub mod time;
