//! Overlayfx library.
//!
//! Timed visual-effect overlays for an ECS world: radiation-pulse glows and
//! salvage-magnet beams, each tracked per entity with its own shader
//! instances. Exposes the components, resources, rendering seam, overlays,
//! and systems for the binary and for integration tests.

pub mod components;
pub mod game;
pub mod overlays;
pub mod render;
pub mod resources;
pub mod systems;
