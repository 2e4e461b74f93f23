//! Viewport and eye description for a rendered frame.
//!
//! World space is Y-up and measured in world units. Viewport-local space is
//! measured in pixels from the top-left corner of the viewport, Y-down.
//! Shaders that work in framebuffer coordinates want Y-up pixels again, see
//! [`Viewport::world_to_shader`].

use glam::{Affine2, UVec2, Vec2};

use crate::components::mapposition::MapId;
use crate::render::geometry::{Box2, Box2Rotated};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ViewportId(pub u32);

/// The camera a viewport looks through.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Eye {
    pub map: MapId,
    /// World position at the center of the viewport.
    pub position: Vec2,
    pub zoom: f32,
    /// Rotation of the eye in radians.
    pub rotation: f32,
}

impl Eye {
    pub fn new(map: MapId, position: Vec2) -> Self {
        Self {
            map,
            position,
            zoom: 1.0,
            rotation: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub id: ViewportId,
    /// Size in pixels.
    pub size: UVec2,
    /// Ratio between viewport pixels and framebuffer pixels.
    pub render_scale: Vec2,
    pub pixels_per_unit: f32,
    /// `None` while the viewport has nothing to look through.
    pub eye: Option<Eye>,
}

impl Viewport {
    pub fn new(id: ViewportId, size: UVec2, pixels_per_unit: f32, eye: Option<Eye>) -> Self {
        Self {
            id,
            size,
            render_scale: Vec2::ONE,
            pixels_per_unit,
            eye,
        }
    }

    fn units_to_pixels(&self) -> f32 {
        let zoom = self.eye.map_or(1.0, |e| e.zoom);
        self.pixels_per_unit * zoom
    }

    /// World to viewport-local transform. Identity without an eye.
    pub fn world_to_local_matrix(&self) -> Affine2 {
        let Some(eye) = self.eye else {
            return Affine2::IDENTITY;
        };
        let s = self.units_to_pixels();
        Affine2::from_translation(self.size.as_vec2() * 0.5)
            * Affine2::from_scale(Vec2::new(s, -s))
            * Affine2::from_angle(-eye.rotation)
            * Affine2::from_translation(-eye.position)
    }

    pub fn world_to_local(&self, point: Vec2) -> Vec2 {
        self.world_to_local_matrix().transform_point2(point)
    }

    /// Viewport-local position with the Y axis flipped to match framebuffer
    /// coordinates (origin bottom-left).
    pub fn world_to_shader(&self, point: Vec2) -> Vec2 {
        let local = self.world_to_local(point);
        Vec2::new(local.x, self.size.y as f32 - local.y)
    }

    /// Area of the world visible through this viewport.
    pub fn world_bounds(&self) -> Box2Rotated {
        let (center, rotation) = self
            .eye
            .map_or((Vec2::ZERO, 0.0), |e| (e.position, e.rotation));
        let extent = self.size.as_vec2() / self.units_to_pixels();
        Box2Rotated::new(Box2::centered_around(center, extent), rotation, center)
    }
}
