//! Spatial index rebuild system.
//!
//! Refills [`SpatialIndex`](crate::resources::spatialindex::SpatialIndex)
//! from every entity's [`MapPosition`](crate::components::mapposition::MapPosition).
//! Run it after anything that moves entities and before overlays draw.

use bevy_ecs::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::resources::spatialindex::SpatialIndex;

pub fn rebuild_spatial_index(
    mut index: ResMut<SpatialIndex>,
    query: Query<(Entity, &MapPosition)>,
) {
    index.clear();
    for (entity, position) in query.iter() {
        index.insert(entity, position);
    }
}
