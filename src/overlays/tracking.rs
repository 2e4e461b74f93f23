//! Per-frame tracking of entities that currently show a visual effect.
//!
//! A [`TrackingCache`] maps each tracked entity to the shader instances it
//! owns and to the effect's current geometry. [`TrackingCache::refresh`] runs
//! once per frame in two phases:
//!
//! 1. **Admission** – every candidate that is not tracked yet is captured and
//!    checked against [`EffectKind::qualifies`]. Qualifying candidates get a
//!    fresh set of shader instances and an entry. A candidate that is already
//!    tracked is left alone; phase 2 brings it up to date.
//! 2. **Eviction and refresh** – every entry is re-captured from live entity
//!    state. Entries whose entity is gone, whose data is missing, or that no
//!    longer qualify are removed and their shaders released. The rest get their
//!    geometry updated in place.
//!
//! After a refresh the cache holds exactly the qualifying entities, each once,
//! each with one live set of shaders.

use bevy_ecs::prelude::*;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::AddAssign;

use crate::render::backend::RenderBackend;
use crate::render::pool::{OwnedShader, ShaderPool, ShaderSet};

/// What a kind of tracked effect needs to know about its entities.
///
/// Each effect kind implements this once, statically. `capture` and
/// `qualifies` together form the qualification predicate: `capture` returns
/// `None` when required data is missing ("not ready yet"), `qualifies` is a
/// pure check of a captured instance against the frame's query.
pub trait EffectKind {
    /// Component marking an entity as a source of this effect.
    type Source: Component;
    /// Geometry and timing of one tracked effect.
    type Instance;
    /// Per-frame query context (eye, view bounds, thresholds).
    type Query;

    /// Name used in log messages.
    const NAME: &'static str;
    /// Shader prototypes duplicated for every tracked entity, in order.
    const PROTOTYPES: &'static [&'static str];

    /// Entities worth considering for admission this frame.
    fn candidates(world: &mut World, _query: &Self::Query) -> Vec<Entity> {
        entities_with::<Self::Source>(world)
    }

    /// Builds an instance from the entity's current state.
    fn capture(world: &World, entity: Entity, query: &Self::Query) -> Option<Self::Instance>;

    fn qualifies(instance: &Self::Instance, query: &Self::Query) -> bool;

    /// Copies the live geometry of `fresh` into a tracked instance.
    fn refresh(tracked: &mut Self::Instance, fresh: Self::Instance);
}

/// Snapshot of every entity carrying component `C`.
pub fn entities_with<C: Component>(world: &mut World) -> Vec<Entity> {
    let mut query = world.query_filtered::<Entity, With<C>>();
    query.iter(world).collect()
}

/// A tracked entity's shader instances and effect state.
#[derive(Debug)]
pub struct TrackedEffect<I> {
    shaders: ShaderSet,
    instance: I,
}

impl<I> TrackedEffect<I> {
    pub fn shaders(&self) -> &[OwnedShader] {
        &self.shaders
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }
}

/// Counts of what happened during one refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub admitted: usize,
    /// Entries that survived phase 2, newly admitted ones included.
    pub refreshed: usize,
    pub evicted: usize,
    /// Candidates skipped because they were already tracked.
    pub already_tracked: usize,
    /// Qualifying candidates skipped because their shaders could not be acquired.
    pub failed: usize,
}

impl AddAssign for RefreshReport {
    fn add_assign(&mut self, rhs: Self) {
        self.admitted += rhs.admitted;
        self.refreshed += rhs.refreshed;
        self.evicted += rhs.evicted;
        self.already_tracked += rhs.already_tracked;
        self.failed += rhs.failed;
    }
}

pub struct TrackingCache<K: EffectKind> {
    entries: FxHashMap<Entity, TrackedEffect<K::Instance>>,
}

impl<K: EffectKind> TrackingCache<K> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&TrackedEffect<K::Instance>> {
        self.entries.get(&entity)
    }

    /// Tracked entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &TrackedEffect<K::Instance>)> {
        self.entries.iter().map(|(entity, tracked)| (*entity, tracked))
    }

    /// Brings the cache in line with the world. See the module docs.
    pub fn refresh(
        &mut self,
        world: &mut World,
        query: &K::Query,
        pool: &mut ShaderPool,
        backend: &mut dyn RenderBackend,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();

        for entity in K::candidates(world, query) {
            if self.entries.contains_key(&entity) {
                debug!(target: "overlay", "{}: {:?} already tracked", K::NAME, entity);
                report.already_tracked += 1;
                continue;
            }
            let Some(instance) = K::capture(world, entity, query) else {
                continue;
            };
            if !K::qualifies(&instance, query) {
                continue;
            }
            match pool.acquire_set(backend, K::PROTOTYPES) {
                Ok(shaders) => {
                    debug!(target: "overlay", "{}: tracking {:?}", K::NAME, entity);
                    self.entries.insert(entity, TrackedEffect { shaders, instance });
                    report.admitted += 1;
                }
                Err(e) => {
                    warn!(target: "overlay", "{}: cannot track {:?} this frame: {}", K::NAME, entity, e);
                    report.failed += 1;
                }
            }
        }

        let world: &World = world;
        let mut stale: SmallVec<[Entity; 8]> = SmallVec::new();
        for (entity, tracked) in self.entries.iter_mut() {
            let fresh = world
                .get_entity(*entity)
                .ok()
                .and_then(|_| K::capture(world, *entity, query))
                .filter(|fresh| K::qualifies(fresh, query));
            match fresh {
                Some(fresh) => {
                    K::refresh(&mut tracked.instance, fresh);
                    report.refreshed += 1;
                }
                None => stale.push(*entity),
            }
        }

        for entity in stale {
            if let Some(tracked) = self.entries.remove(&entity) {
                debug!(target: "overlay", "{}: evicting {:?}", K::NAME, entity);
                pool.release_set(backend, tracked.shaders);
                report.evicted += 1;
            }
        }

        report
    }

    /// Releases every entry.
    pub fn clear(&mut self, pool: &mut ShaderPool, backend: &mut dyn RenderBackend) {
        for (_, tracked) in self.entries.drain() {
            pool.release_set(backend, tracked.shaders);
        }
    }
}

impl<K: EffectKind> Default for TrackingCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EffectKind> Drop for TrackingCache<K> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                target: "overlay",
                "{}: dropped with {} tracked effect(s); shaders go back to the pool's reclaim queue",
                K::NAME,
                self.entries.len()
            );
        }
    }
}
