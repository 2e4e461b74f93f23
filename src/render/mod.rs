//! Rendering seam for overlays.
//!
//! - [`backend`] – the [`backend::RenderBackend`] trait, handles, and the
//!   scoped [`backend::DrawScope`] guard
//! - [`geometry`] – axis-aligned and rotated boxes
//! - [`pool`] – duplication and release of shader instances
//! - [`recording`] – headless backend that records draw calls
//! - [`viewport`] – viewport, eye, and world/local transforms
//! - `raylib_backend` – windowed backend (feature `raylib`)

pub mod backend;
pub mod geometry;
pub mod pool;
#[cfg(feature = "raylib")]
pub mod raylib_backend;
pub mod recording;
pub mod viewport;
