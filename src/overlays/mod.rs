//! Timed visual-effect overlays.
//!
//! An overlay keeps a [`tracking::TrackingCache`] of the entities that
//! currently show its effect and draws them every frame. The
//! [`OverlayManager`] owns all overlays together with the resources they share
//! and is the single per-frame entry point.
//!
//! Submodules overview
//! - [`tracking`] – the admit/evict/refresh cache shared by all overlays
//! - [`radiation`] – radial glows around radiation pulses near the eye
//! - [`salvagebeam`] – beams between salvage magnets and what they hold

pub mod radiation;
pub mod salvagebeam;
pub mod tracking;

use bevy_ecs::prelude::*;
use log::{info, warn};

use crate::overlays::radiation::RadiationPulseOverlay;
use crate::overlays::salvagebeam::SalvageBeamOverlay;
use crate::overlays::tracking::RefreshReport;
use crate::render::backend::RenderBackend;
use crate::render::pool::ShaderPool;
use crate::render::viewport::Viewport;
use crate::resources::distortionmap::DistortionMaps;
use crate::resources::overlayconfig::OverlayConfig;

/// Everything an overlay needs to know about the frame being drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameArgs {
    pub viewport: Viewport,
    /// Simulation time of this frame.
    pub now: f32,
}

/// One overlay, by kind.
pub enum EffectOverlay {
    RadiationPulse(RadiationPulseOverlay),
    SalvageBeam(SalvageBeamOverlay),
}

impl EffectOverlay {
    pub fn name(&self) -> &'static str {
        match self {
            EffectOverlay::RadiationPulse(_) => "radiation",
            EffectOverlay::SalvageBeam(_) => "salvage beam",
        }
    }

    /// Number of entities currently tracked.
    pub fn tracked(&self) -> usize {
        match self {
            EffectOverlay::RadiationPulse(o) => o.cache().len(),
            EffectOverlay::SalvageBeam(o) => o.cache().len(),
        }
    }

    fn draw(
        &mut self,
        world: &mut World,
        frame: &FrameArgs,
        backend: &mut dyn RenderBackend,
        pool: &mut ShaderPool,
        distortion: Option<&mut DistortionMaps>,
    ) -> RefreshReport {
        match self {
            EffectOverlay::RadiationPulse(o) => o.draw(world, frame, backend, pool, distortion),
            EffectOverlay::SalvageBeam(o) => o.draw(world, frame, backend, pool),
        }
    }

    fn clear(&mut self, pool: &mut ShaderPool, backend: &mut dyn RenderBackend) {
        match self {
            EffectOverlay::RadiationPulse(o) => o.clear(pool, backend),
            EffectOverlay::SalvageBeam(o) => o.clear(pool, backend),
        }
    }
}

/// Owns the overlays, the shader pool they share, and the distortion maps.
///
/// Stored in the world as a non-send resource; see
/// [`overlay_render_system`](crate::systems::overlays::overlay_render_system).
/// Call [`shutdown`](Self::shutdown) before dropping it so every shader
/// instance and render target is released through the backend.
///
/// Dropping the manager without `shutdown` cannot dispose anything: there is
/// no backend at drop time, and instances queued for reclaim go away with the
/// pool. They stay allocated in the backend and the drop only logs a warning
/// with the counts.
pub struct OverlayManager {
    overlays: Vec<EffectOverlay>,
    pool: ShaderPool,
    distortion: Option<DistortionMaps>,
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayManager {
    /// Creates a manager with no overlays and no distortion maps.
    pub fn new() -> Self {
        Self {
            overlays: Vec::new(),
            pool: ShaderPool::new(),
            distortion: None,
        }
    }

    /// Manager with both overlays set up from `config`.
    pub fn from_config(config: &OverlayConfig) -> Self {
        let mut manager = Self::new();
        if config.distortion {
            manager = manager.with_distortion(DistortionMaps::new(config.distortion_size_div));
        }
        manager.add(EffectOverlay::RadiationPulse(
            RadiationPulseOverlay::new(config.radiation_max_distance)
                .with_distortion(config.distortion),
        ));
        manager.add(EffectOverlay::SalvageBeam(SalvageBeamOverlay::new(
            config.beam_width,
        )));
        manager
    }

    pub fn with_distortion(mut self, maps: DistortionMaps) -> Self {
        self.distortion = Some(maps);
        self
    }

    pub fn add(&mut self, overlay: EffectOverlay) {
        info!("Adding {} overlay", overlay.name());
        self.overlays.push(overlay);
    }

    /// Removes the first overlay named `name`, releasing what it tracks.
    pub fn remove(&mut self, name: &str, backend: &mut dyn RenderBackend) -> bool {
        let Some(index) = self.overlays.iter().position(|o| o.name() == name) else {
            return false;
        };
        let mut overlay = self.overlays.remove(index);
        overlay.clear(&mut self.pool, backend);
        true
    }

    pub fn radiation(&self) -> Option<&RadiationPulseOverlay> {
        self.overlays.iter().find_map(|o| match o {
            EffectOverlay::RadiationPulse(r) => Some(r),
            _ => None,
        })
    }

    pub fn salvage_beam(&self) -> Option<&SalvageBeamOverlay> {
        self.overlays.iter().find_map(|o| match o {
            EffectOverlay::SalvageBeam(b) => Some(b),
            _ => None,
        })
    }

    pub fn pool(&self) -> &ShaderPool {
        &self.pool
    }

    pub fn distortion(&self) -> Option<&DistortionMaps> {
        self.distortion.as_ref()
    }

    /// Refreshes and draws every overlay, in insertion order.
    pub fn draw(
        &mut self,
        world: &mut World,
        frame: &FrameArgs,
        backend: &mut dyn RenderBackend,
    ) -> RefreshReport {
        self.pool.reclaim(backend);
        let mut total = RefreshReport::default();
        for overlay in self.overlays.iter_mut() {
            total += overlay.draw(
                world,
                frame,
                backend,
                &mut self.pool,
                self.distortion.as_mut(),
            );
        }
        total
    }

    /// Releases every tracked effect and render target.
    pub fn shutdown(&mut self, backend: &mut dyn RenderBackend) {
        for overlay in self.overlays.iter_mut() {
            overlay.clear(&mut self.pool, backend);
        }
        self.pool.reclaim(backend);
        if let Some(maps) = self.distortion.as_mut() {
            maps.release_all(backend);
        }
        info!(
            "Overlays shut down: {} shader instance(s) acquired, {} released",
            self.pool.acquired(),
            self.pool.released()
        );
    }
}

impl Drop for OverlayManager {
    fn drop(&mut self) {
        let tracked: usize = self.overlays.iter().map(EffectOverlay::tracked).sum();
        if tracked > 0 || self.pool.live() > 0 {
            warn!(
                "OverlayManager dropped without shutdown: {} tracked effect(s), {} live shader instance(s)",
                tracked,
                self.pool.live()
            );
        }
    }
}
