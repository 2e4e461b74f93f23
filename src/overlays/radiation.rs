//! Radiation pulse overlay.
//!
//! Draws a radial glow for every [`RadiationPulse`] on the eye's map within
//! `max_distance` of the eye. Each tracked pulse owns two shader instances:
//! the primary glow and a distortion variant drawn into the viewport's
//! [`DistortionMap`] when one is available.
//!
//! Per pulse and frame the shaders receive:
//! - `renderScale` – viewport render scale
//! - `positionInput` – pulse origin in viewport pixels, Y-up
//! - `range` – pulse radius in world units
//! - `life` – normalized lifetime in `[0, 1]`

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::{debug, warn};

use crate::components::mapposition::{MapId, MapPosition};
use crate::components::radiationpulse::{RadiationPulse, normalized_lifetime};
use crate::overlays::FrameArgs;
use crate::overlays::tracking::{EffectKind, RefreshReport, TrackedEffect, TrackingCache, entities_with};
use crate::render::backend::{
    Color, DrawScope, RenderBackend, RenderError, ShaderParam, apply_params,
};
use crate::render::geometry::{Box2, Box2Rotated};
use crate::render::pool::ShaderPool;
use crate::render::viewport::Eye;
use crate::resources::distortionmap::{DistortionMap, DistortionMaps};
use crate::resources::shaderstore::{RADIATION, RADIATION_DISTORTION};
use crate::resources::spatialindex::SpatialIndex;

/// Eye distance beyond which pulses are not drawn.
pub const DEFAULT_MAX_DISTANCE: f32 = 15.0;

/// A tracked pulse. Position and range follow the entity every frame; the
/// time window is fixed when tracking starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseInstance {
    pub map: MapId,
    pub origin: Vec2,
    pub range: f32,
    pub start: f32,
    pub end: f32,
}

impl PulseInstance {
    pub fn normalized_lifetime(&self, now: f32) -> f32 {
        normalized_lifetime(self.start, self.end, now)
    }

    /// Square of side `2 * range` centered on the origin.
    pub fn bounds(&self) -> Box2 {
        Box2::centered_around(self.origin, Vec2::splat(self.range * 2.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseQuery {
    pub eye: Eye,
    pub max_distance: f32,
}

/// True when `origin` is on the eye's map and no farther than
/// `max_distance` from the eye. The boundary distance qualifies.
pub fn pulse_qualifies(map: MapId, origin: Vec2, query: &PulseQuery) -> bool {
    map == query.eye.map
        && origin.distance_squared(query.eye.position) <= query.max_distance * query.max_distance
}

pub struct RadiationPulseKind;

impl EffectKind for RadiationPulseKind {
    type Source = RadiationPulse;
    type Instance = PulseInstance;
    type Query = PulseQuery;

    const NAME: &'static str = "radiation";
    const PROTOTYPES: &'static [&'static str] = &[RADIATION, RADIATION_DISTORTION];

    /// Pulses near the eye according to the [`SpatialIndex`] when the world
    /// has one, otherwise every pulse.
    fn candidates(world: &mut World, query: &PulseQuery) -> Vec<Entity> {
        if let Some(index) = world.get_resource::<SpatialIndex>() {
            let around_eye =
                Box2::centered_around(query.eye.position, Vec2::splat(query.max_distance * 2.0));
            return index
                .find_intersecting(query.eye.map, &around_eye)
                .into_iter()
                .filter(|e| world.get::<RadiationPulse>(*e).is_some())
                .collect();
        }
        entities_with::<RadiationPulse>(world)
    }

    fn capture(world: &World, entity: Entity, _query: &PulseQuery) -> Option<PulseInstance> {
        let pulse = world.get::<RadiationPulse>(entity)?;
        let position = world.get::<MapPosition>(entity)?;
        Some(PulseInstance {
            map: position.map,
            origin: position.pos,
            range: pulse.range,
            start: pulse.start_time,
            end: pulse.end_time,
        })
    }

    fn qualifies(instance: &PulseInstance, query: &PulseQuery) -> bool {
        pulse_qualifies(instance.map, instance.origin, query)
    }

    fn refresh(tracked: &mut PulseInstance, fresh: PulseInstance) {
        tracked.map = fresh.map;
        tracked.origin = fresh.origin;
        tracked.range = fresh.range;
    }
}

pub struct RadiationPulseOverlay {
    cache: TrackingCache<RadiationPulseKind>,
    max_distance: f32,
    distortion: bool,
}

impl Default for RadiationPulseOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE)
    }
}

impl RadiationPulseOverlay {
    pub fn new(max_distance: f32) -> Self {
        Self {
            cache: TrackingCache::new(),
            max_distance,
            distortion: true,
        }
    }

    /// Enables or disables the distortion pass.
    pub fn with_distortion(mut self, enabled: bool) -> Self {
        self.distortion = enabled;
        self
    }

    pub fn cache(&self) -> &TrackingCache<RadiationPulseKind> {
        &self.cache
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Refreshes the tracked pulses and draws them.
    ///
    /// Without an eye nothing can qualify, so every tracked pulse is released.
    pub fn draw(
        &mut self,
        world: &mut World,
        frame: &FrameArgs,
        backend: &mut dyn RenderBackend,
        pool: &mut ShaderPool,
        distortion: Option<&mut DistortionMaps>,
    ) -> RefreshReport {
        let Some(eye) = frame.viewport.eye else {
            if !self.cache.is_empty() {
                debug!(target: "overlay", "radiation: no eye, releasing {} pulse(s)", self.cache.len());
                let evicted = self.cache.len();
                self.cache.clear(pool, backend);
                return RefreshReport {
                    evicted,
                    ..RefreshReport::default()
                };
            }
            return RefreshReport::default();
        };

        let query = PulseQuery {
            eye,
            max_distance: self.max_distance,
        };
        let report = self.cache.refresh(world, &query, pool, backend);
        if self.cache.is_empty() {
            return report;
        }

        let map = match distortion {
            Some(maps) if self.distortion => maps.get_or_create(backend, &frame.viewport).ok(),
            _ => None,
        };

        let mut scope = DrawScope::new(backend, frame.viewport.world_to_local_matrix());
        for (entity, tracked) in self.cache.iter() {
            if let Err(e) = draw_pulse(&mut *scope, tracked, frame, map.as_ref()) {
                warn!(target: "overlay", "radiation: failed to draw {:?}: {}", entity, e);
            }
        }
        report
    }

    /// Releases every tracked pulse.
    pub fn clear(&mut self, pool: &mut ShaderPool, backend: &mut dyn RenderBackend) {
        self.cache.clear(pool, backend);
    }
}

fn draw_pulse(
    backend: &mut dyn RenderBackend,
    tracked: &TrackedEffect<PulseInstance>,
    frame: &FrameArgs,
    map: Option<&DistortionMap>,
) -> Result<(), RenderError> {
    let [primary, distortion] = tracked.shaders() else {
        return Err(RenderError::DrawFailed(
            "pulse is missing a shader instance".to_string(),
        ));
    };
    let pulse = tracked.instance();
    let params = [
        ("renderScale", ShaderParam::Vec2(frame.viewport.render_scale)),
        (
            "positionInput",
            ShaderParam::Vec2(frame.viewport.world_to_shader(pulse.origin)),
        ),
        ("range", ShaderParam::Float(pulse.range)),
        ("life", ShaderParam::Float(pulse.normalized_lifetime(frame.now))),
    ];

    apply_params(backend, primary.id(), &params)?;
    backend.use_shader(Some(primary.id()))?;
    backend.draw_rect(&Box2Rotated::axis_aligned(pulse.bounds()), Color::WHITE)?;

    if let Some(map) = map {
        let shader = distortion.id();
        let rect = Box2Rotated::axis_aligned(pulse.bounds().scaled_down(map.size_div));
        let result = backend.render_into(map.target, &mut |b: &mut dyn RenderBackend| {
            apply_params(b, shader, &params)?;
            b.use_shader(Some(shader))?;
            b.draw_rect(&rect, Color::WHITE)
        });
        if let Err(e) = result {
            debug!(target: "overlay", "radiation: distortion pass skipped: {}", e);
        }
    }
    Ok(())
}
