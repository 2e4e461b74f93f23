//! Headless rendering backend.
//!
//! [`RecordingBackend`] keeps every draw call as a [`DrawCommand`] instead of
//! rasterizing it, and tracks shader instances and their uniform values. The
//! headless demo renders through it, and the tests use it to observe exactly
//! what an overlay acquired, released, and drew.
//!
//! Failures can be injected to exercise error paths: failing prototypes,
//! unavailable render targets, and rejected draw calls.

use glam::{Affine2, UVec2};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::render::backend::{
    Color, DrawFn, RenderBackend, RenderError, RenderTargetId, ShaderId, ShaderParam,
};
use crate::render::geometry::Box2Rotated;
use crate::resources::shaderstore::ShaderStore;

/// A recorded draw call and the state it was issued under.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// `None` when drawing to the main framebuffer.
    pub target: Option<RenderTargetId>,
    pub shader: Option<ShaderId>,
    pub rect: Box2Rotated,
    pub tint: Color,
    pub transform: Affine2,
}

pub struct RecordingBackend {
    prototypes: ShaderStore,
    next_shader: u32,
    next_target: u32,
    live: FxHashMap<ShaderId, Arc<str>>,
    params: FxHashMap<ShaderId, FxHashMap<String, ShaderParam>>,
    duplicated: u64,
    disposed: u64,
    invalid_disposes: u64,
    bound: Option<ShaderId>,
    transform: Affine2,
    targets: FxHashMap<RenderTargetId, UVec2>,
    current_target: Option<RenderTargetId>,
    commands: Vec<DrawCommand>,
    failing_prototypes: FxHashSet<String>,
    targets_unavailable: bool,
    failing_draws: u32,
}

impl RecordingBackend {
    pub fn new(prototypes: ShaderStore) -> Self {
        Self {
            prototypes,
            next_shader: 1,
            next_target: 1,
            live: FxHashMap::default(),
            params: FxHashMap::default(),
            duplicated: 0,
            disposed: 0,
            invalid_disposes: 0,
            bound: None,
            transform: Affine2::IDENTITY,
            targets: FxHashMap::default(),
            current_target: None,
            commands: Vec::new(),
            failing_prototypes: FxHashSet::default(),
            targets_unavailable: false,
            failing_draws: 0,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Returns and clears the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn duplicated(&self) -> u64 {
        self.duplicated
    }

    pub fn disposed(&self) -> u64 {
        self.disposed
    }

    /// Dispose calls for handles that were not live (double release).
    pub fn invalid_disposes(&self) -> u64 {
        self.invalid_disposes
    }

    pub fn live_shaders(&self) -> usize {
        self.live.len()
    }

    pub fn live_shaders_of(&self, prototype: &str) -> usize {
        self.live.values().filter(|p| &***p == prototype).count()
    }

    pub fn shader_prototype(&self, shader: ShaderId) -> Option<&str> {
        self.live.get(&shader).map(|p| &**p)
    }

    pub fn param(&self, shader: ShaderId, name: &str) -> Option<ShaderParam> {
        self.params.get(&shader)?.get(name).copied()
    }

    pub fn bound_shader(&self) -> Option<ShaderId> {
        self.bound
    }

    pub fn render_target_count(&self) -> usize {
        self.targets.len()
    }

    /// Makes every following duplication of `prototype` fail.
    pub fn fail_prototype(&mut self, prototype: &str) {
        self.failing_prototypes.insert(prototype.to_string());
    }

    pub fn restore_prototype(&mut self, prototype: &str) {
        self.failing_prototypes.remove(prototype);
    }

    pub fn set_targets_unavailable(&mut self, unavailable: bool) {
        self.targets_unavailable = unavailable;
    }

    /// Rejects the next `count` draw calls.
    pub fn fail_next_draws(&mut self, count: u32) {
        self.failing_draws = count;
    }
}

impl RenderBackend for RecordingBackend {
    fn duplicate_shader(&mut self, prototype: &str) -> Result<ShaderId, RenderError> {
        if !self.prototypes.contains(prototype) {
            return Err(RenderError::UnknownPrototype(prototype.to_string()));
        }
        if self.failing_prototypes.contains(prototype) {
            return Err(RenderError::Compilation {
                prototype: prototype.to_string(),
                details: "injected failure".to_string(),
            });
        }
        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.live.insert(id, Arc::from(prototype));
        self.duplicated += 1;
        Ok(id)
    }

    fn dispose_shader(&mut self, shader: ShaderId) {
        if self.live.remove(&shader).is_none() {
            warn!("Dispose of unknown shader instance {:?}", shader);
            self.invalid_disposes += 1;
            return;
        }
        self.params.remove(&shader);
        if self.bound == Some(shader) {
            self.bound = None;
        }
        self.disposed += 1;
    }

    fn set_shader_param(
        &mut self,
        shader: ShaderId,
        name: &str,
        value: ShaderParam,
    ) -> Result<(), RenderError> {
        if !self.live.contains_key(&shader) {
            return Err(RenderError::UnknownShader(shader));
        }
        self.params
            .entry(shader)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn use_shader(&mut self, shader: Option<ShaderId>) -> Result<(), RenderError> {
        if let Some(id) = shader {
            if !self.live.contains_key(&id) {
                return Err(RenderError::UnknownShader(id));
            }
        }
        self.bound = shader;
        Ok(())
    }

    fn draw_rect(&mut self, rect: &Box2Rotated, tint: Color) -> Result<(), RenderError> {
        if self.failing_draws > 0 {
            self.failing_draws -= 1;
            return Err(RenderError::DrawFailed("injected failure".to_string()));
        }
        self.commands.push(DrawCommand {
            target: self.current_target,
            shader: self.bound,
            rect: *rect,
            tint,
            transform: self.transform,
        });
        Ok(())
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
    }

    fn transform(&self) -> Affine2 {
        self.transform
    }

    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTargetId, RenderError> {
        if self.targets_unavailable {
            return Err(RenderError::TargetUnavailable(
                "render targets disabled".to_string(),
            ));
        }
        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, size);
        Ok(id)
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target);
    }

    fn render_into(
        &mut self,
        target: RenderTargetId,
        draw: &mut DrawFn<'_>,
    ) -> Result<(), RenderError> {
        if self.targets_unavailable || !self.targets.contains_key(&target) {
            return Err(RenderError::TargetUnavailable(format!(
                "{:?} does not exist",
                target
            )));
        }
        let previous = self.current_target.replace(target);
        let result = draw(self);
        self.current_target = previous;
        result
    }
}
