//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world and
//! accessed by systems and overlays during execution.
//!
//! Overview
//! - `distortionmap` – per-viewport render targets for the distortion pass
//! - `overlayconfig` – INI-backed overlay tuning and viewport settings
//! - `shaderstore` – shader prototype sources keyed by name
//! - `spatialindex` – uniform grid of positioned entities for range queries
//! - `worldtime` – simulation time and delta
pub mod distortionmap;
pub mod overlayconfig;
pub mod shaderstore;
pub mod spatialindex;
pub mod worldtime;
