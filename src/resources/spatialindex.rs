//! Tile-grid spatial index.
//!
//! [`SpatialIndex`] buckets positioned entities into square cells per map so
//! that range queries only touch nearby cells. It is rebuilt every frame by
//! [`rebuild_spatial_index`](crate::systems::spatialindex::rebuild_spatial_index);
//! between rebuilds its answers may lag behind moving entities, so callers
//! that need exact answers re-check positions themselves.

use bevy_ecs::prelude::{Entity, Resource};
use glam::{I64Vec2, IVec2, Vec2};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::mapposition::{MapId, MapPosition};
use crate::render::geometry::Box2;

const DEFAULT_CELL_SIZE: f32 = 8.0;

type Cell = SmallVec<[(Entity, Vec2); 4]>;

#[derive(Resource, Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: FxHashMap<(MapId, IVec2), Cell>,
    len: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: FxHashMap::default(),
            len: 0,
        }
    }

    fn cell_of(&self, pos: Vec2) -> IVec2 {
        (pos / self.cell_size).floor().as_ivec2()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    pub fn insert(&mut self, entity: Entity, position: &MapPosition) {
        let cell = self.cell_of(position.pos);
        self.cells
            .entry((position.map, cell))
            .or_default()
            .push((entity, position.pos));
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entities on `map` whose indexed position lies inside `bounds`
    /// (edges included). Order is unspecified.
    pub fn find_intersecting(&self, map: MapId, bounds: &Box2) -> Vec<Entity> {
        let lo = self.cell_of(bounds.min);
        let hi = self.cell_of(bounds.max);
        // Cells saturate at the i32 range, so the span is only safe in i64.
        let span = hi.as_i64vec2() - lo.as_i64vec2() + I64Vec2::ONE;
        let mut found = Vec::new();

        let mut collect = |cell: &Cell| {
            found.extend(
                cell.iter()
                    .filter(|(_, pos)| bounds.contains(*pos))
                    .map(|(entity, _)| *entity),
            );
        };

        if span.x.saturating_mul(span.y) > self.cells.len() as i64 {
            // Cheaper to walk the occupied cells than every cell in the box.
            for ((cell_map, cell), entries) in &self.cells {
                if *cell_map == map && cell.cmpge(lo).all() && cell.cmple(hi).all() {
                    collect(entries);
                }
            }
        } else {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    if let Some(entries) = self.cells.get(&(map, IVec2::new(x, y))) {
                        collect(entries);
                    }
                }
            }
        }
        found
    }
}
