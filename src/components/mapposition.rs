//! World-space placement of an entity.
//!
//! [`MapPosition`] carries both the logical map an entity lives on and its
//! position inside that map. Overlays treat an entity without a `MapPosition`
//! as "not ready yet" and never track it.

use bevy_ecs::prelude::Component;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier of a logical map (level). Entities on different maps never
/// interact spatially, whatever their coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub u32);

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct MapPosition {
    pub map: MapId,
    pub pos: Vec2,
}

impl MapPosition {
    pub fn new(map: MapId, x: f32, y: f32) -> Self {
        Self {
            map,
            pos: Vec2::new(x, y),
        }
    }
}

