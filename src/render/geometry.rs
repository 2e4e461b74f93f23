//! 2D boxes used for culling and draw geometry.
//!
//! [`Box2`] is an axis-aligned rectangle. [`Box2Rotated`] is a box rotated
//! around an origin; it describes beam quads and rotated view bounds, and is
//! culled through its axis-aligned [`Box2Rotated::calc_bounding_box`].

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Box2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box of the given full `size` centered on `center`.
    pub fn centered_around(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Overlap test. Touching edges count as intersecting.
    pub fn intersects(&self, other: &Box2) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Box with both corners divided by `div`.
    pub fn scaled_down(&self, div: f32) -> Self {
        Self::new(self.min / div, self.max / div)
    }
}

/// A [`Box2`] rotated by `rotation` radians around `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2Rotated {
    pub rect: Box2,
    pub rotation: f32,
    pub origin: Vec2,
}

impl Box2Rotated {
    pub fn new(rect: Box2, rotation: f32, origin: Vec2) -> Self {
        Self {
            rect,
            rotation,
            origin,
        }
    }

    pub fn axis_aligned(rect: Box2) -> Self {
        Self::new(rect, 0.0, rect.center())
    }

    /// Quad of thickness `width` covering the segment `from`..`to`.
    ///
    /// The unrotated box lies along the X axis, centered on the segment's
    /// midpoint, and is rotated by the segment's angle.
    pub fn from_line(from: Vec2, to: Vec2, width: f32) -> Self {
        let diff = to - from;
        let center = from + diff * 0.5;
        let rect = Box2::centered_around(center, Vec2::new(diff.length(), width));
        Self::new(rect, diff.y.atan2(diff.x), center)
    }

    /// Corners in counter-clockwise order starting at the unrotated minimum.
    pub fn corners(&self) -> [Vec2; 4] {
        let rot = Vec2::from_angle(self.rotation);
        let Box2 { min, max } = self.rect;
        [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ]
        .map(|c| self.origin + rot.rotate(c - self.origin))
    }

    /// Smallest axis-aligned box containing every corner.
    pub fn calc_bounding_box(&self) -> Box2 {
        let corners = self.corners();
        let (min, max) = corners[1..]
            .iter()
            .fold((corners[0], corners[0]), |(min, max), c| (min.min(*c), max.max(*c)));
        Box2 { min, max }
    }
}
