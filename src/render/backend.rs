//! The rendering backend seam.
//!
//! Overlays never talk to a graphics API directly. They go through
//! [`RenderBackend`], which owns shader instances, render targets, and the
//! current transform. The headless [`RecordingBackend`](crate::render::recording::RecordingBackend)
//! and the raylib backend both implement it.

use glam::{Affine2, UVec2, Vec2};
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::render::geometry::Box2Rotated;

/// Handle to a shader instance owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Handle to an offscreen render target owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

/// Uniform value passed to a shader instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderParam {
    Float(f32),
    Vec2(Vec2),
}

/// RGBA color used to modulate draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Errors reported by a [`RenderBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No shader prototype is registered under this name.
    UnknownPrototype(String),
    /// The shader handle does not refer to a live instance.
    UnknownShader(ShaderId),
    /// The prototype exists but could not be turned into an instance.
    Compilation { prototype: String, details: String },
    /// A render target could not be created or is gone.
    TargetUnavailable(String),
    /// The backend refused a draw call.
    DrawFailed(String),
    /// An effect asked for more shader instances than a set can hold.
    TooManyShaders { requested: usize, max: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownPrototype(name) => write!(f, "Unknown shader prototype '{name}'"),
            RenderError::UnknownShader(id) => write!(f, "Shader instance {id:?} is not live"),
            RenderError::Compilation { prototype, details } => {
                write!(f, "Failed to instantiate shader '{prototype}': {details}")
            }
            RenderError::TargetUnavailable(details) => {
                write!(f, "Render target unavailable: {details}")
            }
            RenderError::DrawFailed(details) => write!(f, "Draw call failed: {details}"),
            RenderError::TooManyShaders { requested, max } => {
                write!(f, "Effect needs {requested} shader instances, at most {max} are supported")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Callback drawing into an offscreen target.
pub type DrawFn<'f> = dyn FnMut(&mut dyn RenderBackend) -> Result<(), RenderError> + 'f;

pub trait RenderBackend {
    /// Creates a fresh instance of the named shared prototype.
    ///
    /// The prototype itself is left untouched; every call returns a new,
    /// independently owned instance that must be passed to
    /// [`dispose_shader`](Self::dispose_shader) exactly once.
    fn duplicate_shader(&mut self, prototype: &str) -> Result<ShaderId, RenderError>;

    /// Releases a shader instance created by [`duplicate_shader`](Self::duplicate_shader).
    fn dispose_shader(&mut self, shader: ShaderId);

    fn set_shader_param(
        &mut self,
        shader: ShaderId,
        name: &str,
        value: ShaderParam,
    ) -> Result<(), RenderError>;

    /// Binds a shader for the following draws. `None` restores the default.
    fn use_shader(&mut self, shader: Option<ShaderId>) -> Result<(), RenderError>;

    /// Draws a filled rectangle in the current coordinate space.
    fn draw_rect(&mut self, rect: &Box2Rotated, tint: Color) -> Result<(), RenderError>;

    fn set_transform(&mut self, transform: Affine2);

    fn transform(&self) -> Affine2;

    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTargetId, RenderError>;

    fn release_render_target(&mut self, target: RenderTargetId);

    /// Runs `draw` with `target` as the destination of every draw call.
    fn render_into(
        &mut self,
        target: RenderTargetId,
        draw: &mut DrawFn<'_>,
    ) -> Result<(), RenderError>;
}

/// Scoped drawing state.
///
/// Installs `transform` on creation. On drop the identity transform is
/// restored and any bound shader is unbound, whichever way the scope is left.
pub struct DrawScope<'a> {
    backend: &'a mut dyn RenderBackend,
}

impl<'a> DrawScope<'a> {
    pub fn new(backend: &'a mut dyn RenderBackend, transform: Affine2) -> Self {
        backend.set_transform(transform);
        Self { backend }
    }
}

impl<'a> Deref for DrawScope<'a> {
    type Target = dyn RenderBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl<'a> DerefMut for DrawScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for DrawScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.use_shader(None) {
            log::warn!(target: "overlay", "Failed to unbind shader: {}", e);
        }
        self.backend.set_transform(Affine2::IDENTITY);
    }
}

/// Applies a list of named parameters to a shader instance.
pub fn apply_params(
    backend: &mut dyn RenderBackend,
    shader: ShaderId,
    params: &[(&str, ShaderParam)],
) -> Result<(), RenderError> {
    for (name, value) in params {
        backend.set_shader_param(shader, name, *value)?;
    }
    Ok(())
}
