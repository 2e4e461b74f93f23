//! ECS components for entities.
//!
//! This module groups the component types the overlays read: where an entity
//! is, whether it is emitting a radiation pulse, and whether it is a salvage
//! magnet holding something.
//!
//! Submodules overview:
//! - [`mapposition`] – map and world-space position of an entity
//! - [`radiationpulse`] – timed radiation emission with a range
//! - [`salvagemagnet`] – magnet offset, attached entity, and magnet state

pub mod mapposition;
pub mod radiationpulse;
pub mod salvagemagnet;
