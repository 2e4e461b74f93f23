//! Salvage beam overlay.
//!
//! Draws a beam from every [`SalvageMagnet`] holding an entity to that entity,
//! as long as the beam's bounding box touches the visible world. Beams are
//! tracked per magnet, so several magnets holding the same entity each get
//! their own beam.

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::{debug, warn};

use crate::components::mapposition::MapPosition;
use crate::components::salvagemagnet::SalvageMagnet;
use crate::overlays::FrameArgs;
use crate::overlays::tracking::{EffectKind, RefreshReport, TrackedEffect, TrackingCache};
use crate::render::backend::{Color, DrawScope, RenderBackend, RenderError};
use crate::render::geometry::Box2Rotated;
use crate::render::pool::ShaderPool;
use crate::resources::shaderstore::SALVAGE_BEAM;

/// Beam thickness in world units.
pub const DEFAULT_BEAM_WIDTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamInstance {
    /// Magnet position.
    pub from: Vec2,
    /// Attached entity position.
    pub to: Vec2,
    pub width: f32,
}

impl BeamInstance {
    pub fn line(&self) -> Box2Rotated {
        Box2Rotated::from_line(self.from, self.to, self.width)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamQuery {
    /// Visible world area.
    pub view: Box2Rotated,
    pub width: f32,
}

pub fn beam_qualifies(instance: &BeamInstance, query: &BeamQuery) -> bool {
    query
        .view
        .calc_bounding_box()
        .intersects(&instance.line().calc_bounding_box())
}

pub struct SalvageBeamKind;

impl EffectKind for SalvageBeamKind {
    type Source = SalvageMagnet;
    type Instance = BeamInstance;
    type Query = BeamQuery;

    const NAME: &'static str = "salvage beam";
    const PROTOTYPES: &'static [&'static str] = &[SALVAGE_BEAM];

    /// Needs an attached entity and a position for both ends.
    fn capture(world: &World, entity: Entity, query: &BeamQuery) -> Option<BeamInstance> {
        let magnet = world.get::<SalvageMagnet>(entity)?;
        let target = magnet.attached_entity?;
        let from = world.get::<MapPosition>(entity)?.pos;
        let to = world.get::<MapPosition>(target)?.pos;
        Some(BeamInstance {
            from,
            to,
            width: query.width,
        })
    }

    fn qualifies(instance: &BeamInstance, query: &BeamQuery) -> bool {
        beam_qualifies(instance, query)
    }

    fn refresh(tracked: &mut BeamInstance, fresh: BeamInstance) {
        *tracked = fresh;
    }
}

pub struct SalvageBeamOverlay {
    cache: TrackingCache<SalvageBeamKind>,
    width: f32,
}

impl Default for SalvageBeamOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_BEAM_WIDTH)
    }
}

impl SalvageBeamOverlay {
    pub fn new(width: f32) -> Self {
        Self {
            cache: TrackingCache::new(),
            width,
        }
    }

    pub fn cache(&self) -> &TrackingCache<SalvageBeamKind> {
        &self.cache
    }

    pub fn draw(
        &mut self,
        world: &mut World,
        frame: &FrameArgs,
        backend: &mut dyn RenderBackend,
        pool: &mut ShaderPool,
    ) -> RefreshReport {
        let query = BeamQuery {
            view: frame.viewport.world_bounds(),
            width: self.width,
        };
        let report = self.cache.refresh(world, &query, pool, backend);
        if self.cache.is_empty() {
            debug!(target: "overlay", "salvage beam: nothing to draw");
            return report;
        }

        let mut scope = DrawScope::new(backend, frame.viewport.world_to_local_matrix());
        for (entity, tracked) in self.cache.iter() {
            if let Err(e) = draw_beam(&mut *scope, tracked) {
                warn!(target: "overlay", "salvage beam: failed to draw {:?}: {}", entity, e);
            }
        }
        report
    }

    pub fn clear(&mut self, pool: &mut ShaderPool, backend: &mut dyn RenderBackend) {
        self.cache.clear(pool, backend);
    }
}

fn draw_beam(
    backend: &mut dyn RenderBackend,
    tracked: &TrackedEffect<BeamInstance>,
) -> Result<(), RenderError> {
    let [shader] = tracked.shaders() else {
        return Err(RenderError::DrawFailed(
            "beam is missing its shader instance".to_string(),
        ));
    };
    backend.use_shader(Some(shader.id()))?;
    backend.draw_rect(&tracked.instance().line(), Color::WHITE)
}
