//! Distortion map render targets.
//!
//! Some overlays render a second, scaled-down pass into a per-viewport
//! distortion map that a later pass uses to warp the scene. The map is
//! `size_div` times smaller than its viewport, so geometry drawn into it is
//! divided by the same factor.
//!
//! Creating the target can fail (no offscreen support, out of memory). The
//! distortion pass is optional: callers skip it and keep drawing normally.

use glam::UVec2;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::render::backend::{RenderBackend, RenderError, RenderTargetId};
use crate::render::viewport::{Viewport, ViewportId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionMap {
    pub target: RenderTargetId,
    pub size: UVec2,
    /// Viewport size divided by map size.
    pub size_div: f32,
}

pub struct DistortionMaps {
    size_div: f32,
    maps: FxHashMap<ViewportId, DistortionMap>,
    warned: FxHashSet<ViewportId>,
}

impl DistortionMaps {
    pub fn new(size_div: f32) -> Self {
        Self {
            size_div: size_div.max(1.0),
            maps: FxHashMap::default(),
            warned: FxHashSet::default(),
        }
    }

    /// The map of a viewport, if one has been created.
    pub fn get(&self, viewport: ViewportId) -> Option<&DistortionMap> {
        self.maps.get(&viewport)
    }

    fn map_size(&self, viewport: &Viewport) -> UVec2 {
        (viewport.size.as_vec2() / self.size_div)
            .ceil()
            .as_uvec2()
            .max(UVec2::ONE)
    }

    /// Returns the map of `viewport`, creating or resizing it as needed.
    pub fn get_or_create(
        &mut self,
        backend: &mut dyn RenderBackend,
        viewport: &Viewport,
    ) -> Result<DistortionMap, RenderError> {
        let size = self.map_size(viewport);
        if let Some(map) = self.maps.get(&viewport.id) {
            if map.size == size {
                return Ok(*map);
            }
            debug!(target: "overlay", "Resizing distortion map of {:?} to {}", viewport.id, size);
            backend.release_render_target(map.target);
            self.maps.remove(&viewport.id);
        }

        match backend.create_render_target(size) {
            Ok(target) => {
                let map = DistortionMap {
                    target,
                    size,
                    size_div: self.size_div,
                };
                self.maps.insert(viewport.id, map);
                self.warned.remove(&viewport.id);
                Ok(map)
            }
            Err(e) => {
                if self.warned.insert(viewport.id) {
                    warn!(target: "overlay", "Distortion map for {:?} unavailable: {}", viewport.id, e);
                }
                Err(e)
            }
        }
    }

    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for (_, map) in self.maps.drain() {
            backend.release_render_target(map.target);
        }
        self.warned.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingBackend;
    use crate::resources::shaderstore::ShaderStore;

    fn viewport(w: u32, h: u32) -> Viewport {
        Viewport::new(ViewportId(3), UVec2::new(w, h), 32.0, None)
    }

    #[test]
    fn created_once_and_reused() {
        let mut backend = RecordingBackend::new(ShaderStore::builtin());
        let mut maps = DistortionMaps::new(4.0);

        let a = maps.get_or_create(&mut backend, &viewport(802, 600)).unwrap();
        let b = maps.get_or_create(&mut backend, &viewport(802, 600)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.size, UVec2::new(201, 150));
        assert_eq!(backend.render_target_count(), 1);
    }

    #[test]
    fn resized_viewport_replaces_target() {
        let mut backend = RecordingBackend::new(ShaderStore::builtin());
        let mut maps = DistortionMaps::new(2.0);

        let a = maps.get_or_create(&mut backend, &viewport(100, 100)).unwrap();
        let b = maps.get_or_create(&mut backend, &viewport(200, 100)).unwrap();
        assert_ne!(a.target, b.target);
        assert_eq!(backend.render_target_count(), 1);

        maps.release_all(&mut backend);
        assert_eq!(backend.render_target_count(), 0);
        assert!(maps.get(ViewportId(3)).is_none());
    }

    #[test]
    fn unavailable_target_is_an_error() {
        let mut backend = RecordingBackend::new(ShaderStore::builtin());
        backend.set_targets_unavailable(true);
        let mut maps = DistortionMaps::new(4.0);
        assert!(maps.get_or_create(&mut backend, &viewport(64, 64)).is_err());
        assert!(maps.get(ViewportId(3)).is_none());
    }
}
