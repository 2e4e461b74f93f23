//! Windowed backend built on raylib.
//!
//! Shader instances are compiled from [`ShaderStore`] sources with
//! `LoadShaderFromMemory`, so every duplicate is an independent GPU program
//! with its own uniforms. Uniform locations are cached per instance; a
//! location of -1 means the uniform was not found (or optimized out) and
//! writes to it are skipped.
//!
//! All calls must happen on the thread that owns the raylib window, between
//! `BeginDrawing` and `EndDrawing`.

use std::ffi::{CString, c_void};

use glam::{Affine2, UVec2};
use log::{debug, warn};
use raylib::ffi;
use rustc_hash::FxHashMap;

use crate::render::backend::{
    Color, DrawFn, RenderBackend, RenderError, RenderTargetId, ShaderId, ShaderParam,
};
use crate::render::geometry::Box2Rotated;
use crate::resources::shaderstore::ShaderStore;

struct ShaderInstance {
    shader: ffi::Shader,
    locations: FxHashMap<String, i32>,
}

pub struct RaylibBackend {
    prototypes: ShaderStore,
    next_shader: u32,
    next_target: u32,
    shaders: FxHashMap<ShaderId, ShaderInstance>,
    targets: FxHashMap<RenderTargetId, ffi::RenderTexture2D>,
    transform: Affine2,
}

impl RaylibBackend {
    pub fn new(prototypes: ShaderStore) -> Self {
        Self {
            prototypes,
            next_shader: 1,
            next_target: 1,
            shaders: FxHashMap::default(),
            targets: FxHashMap::default(),
            transform: Affine2::IDENTITY,
        }
    }

    fn instance(&mut self, shader: ShaderId) -> Result<&mut ShaderInstance, RenderError> {
        self.shaders
            .get_mut(&shader)
            .ok_or(RenderError::UnknownShader(shader))
    }

    /// Loads `transform` into the rlgl modelview matrix.
    fn apply_transform(transform: Affine2) {
        let x = transform.matrix2.x_axis;
        let y = transform.matrix2.y_axis;
        let t = transform.translation;
        let m: [f32; 16] = [
            x.x, x.y, 0.0, 0.0, //
            y.x, y.y, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            t.x, t.y, 0.0, 1.0,
        ];
        unsafe {
            ffi::rlDrawRenderBatchActive();
            ffi::rlLoadIdentity();
            ffi::rlMultMatrixf(m.as_ptr());
        }
    }
}

fn to_ffi_color(color: Color) -> ffi::Color {
    ffi::Color {
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    }
}

impl RenderBackend for RaylibBackend {
    fn duplicate_shader(&mut self, prototype: &str) -> Result<ShaderId, RenderError> {
        let source = self
            .prototypes
            .get(prototype)
            .ok_or_else(|| RenderError::UnknownPrototype(prototype.to_string()))?;
        let invalid_source = |e: std::ffi::NulError| RenderError::Compilation {
            prototype: prototype.to_string(),
            details: e.to_string(),
        };
        let vertex = source
            .vertex
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(invalid_source)?;
        let fragment = CString::new(source.fragment.as_str()).map_err(invalid_source)?;

        let shader = unsafe {
            ffi::LoadShaderFromMemory(
                vertex.as_ref().map_or(std::ptr::null(), |v| v.as_ptr()),
                fragment.as_ptr(),
            )
        };
        if !unsafe { ffi::IsShaderValid(shader) } {
            return Err(RenderError::Compilation {
                prototype: prototype.to_string(),
                details: "raylib rejected the shader program".to_string(),
            });
        }

        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        self.shaders.insert(
            id,
            ShaderInstance {
                shader,
                locations: FxHashMap::default(),
            },
        );
        debug!("Compiled shader instance {:?} from '{}'", id, prototype);
        Ok(id)
    }

    fn dispose_shader(&mut self, shader: ShaderId) {
        match self.shaders.remove(&shader) {
            Some(instance) => unsafe { ffi::UnloadShader(instance.shader) },
            None => warn!("Dispose of unknown shader instance {:?}", shader),
        }
    }

    fn set_shader_param(
        &mut self,
        shader: ShaderId,
        name: &str,
        value: ShaderParam,
    ) -> Result<(), RenderError> {
        let instance = self.instance(shader)?;
        let location = match instance.locations.get(name) {
            Some(loc) => *loc,
            None => {
                let c_name = CString::new(name)
                    .map_err(|e| RenderError::DrawFailed(format!("uniform '{}': {}", name, e)))?;
                let loc = unsafe { ffi::GetShaderLocation(instance.shader, c_name.as_ptr()) };
                instance.locations.insert(name.to_string(), loc);
                loc
            }
        };
        if location < 0 {
            return Ok(());
        }
        unsafe {
            match value {
                ShaderParam::Float(v) => ffi::SetShaderValue(
                    instance.shader,
                    location,
                    &v as *const f32 as *const c_void,
                    ffi::ShaderUniformDataType::SHADER_UNIFORM_FLOAT as i32,
                ),
                ShaderParam::Vec2(v) => {
                    let data = v.to_array();
                    ffi::SetShaderValue(
                        instance.shader,
                        location,
                        data.as_ptr() as *const c_void,
                        ffi::ShaderUniformDataType::SHADER_UNIFORM_VEC2 as i32,
                    )
                }
            }
        }
        Ok(())
    }

    fn use_shader(&mut self, shader: Option<ShaderId>) -> Result<(), RenderError> {
        match shader {
            Some(id) => {
                let program = self.instance(id)?.shader;
                unsafe { ffi::BeginShaderMode(program) };
            }
            None => unsafe { ffi::EndShaderMode() },
        }
        Ok(())
    }

    fn draw_rect(&mut self, rect: &Box2Rotated, tint: Color) -> Result<(), RenderError> {
        let size = rect.rect.size();
        let pivot = rect.origin - rect.rect.min;
        unsafe {
            ffi::DrawRectanglePro(
                ffi::Rectangle {
                    x: rect.origin.x,
                    y: rect.origin.y,
                    width: size.x,
                    height: size.y,
                },
                ffi::Vector2 {
                    x: pivot.x,
                    y: pivot.y,
                },
                rect.rotation.to_degrees(),
                to_ffi_color(tint),
            );
        }
        Ok(())
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
        Self::apply_transform(transform);
    }

    fn transform(&self) -> Affine2 {
        self.transform
    }

    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTargetId, RenderError> {
        let target = unsafe { ffi::LoadRenderTexture(size.x as i32, size.y as i32) };
        if target.id == 0 {
            return Err(RenderError::TargetUnavailable(format!(
                "could not create a {}x{} render texture",
                size.x, size.y
            )));
        }
        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, target);
        Ok(id)
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        if let Some(texture) = self.targets.remove(&target) {
            unsafe { ffi::UnloadRenderTexture(texture) };
        }
    }

    fn render_into(
        &mut self,
        target: RenderTargetId,
        draw: &mut DrawFn<'_>,
    ) -> Result<(), RenderError> {
        let texture = *self
            .targets
            .get(&target)
            .ok_or_else(|| RenderError::TargetUnavailable(format!("{:?} does not exist", target)))?;
        // Texture mode resets the modelview matrix on entry and exit.
        unsafe { ffi::BeginTextureMode(texture) };
        Self::apply_transform(self.transform);
        let result = draw(self);
        unsafe { ffi::EndTextureMode() };
        Self::apply_transform(self.transform);
        result
    }
}

impl Drop for RaylibBackend {
    fn drop(&mut self) {
        if !self.shaders.is_empty() || !self.targets.is_empty() {
            warn!(
                "Raylib backend dropped with {} shader instance(s) and {} render target(s) still loaded",
                self.shaders.len(),
                self.targets.len()
            );
        }
    }
}
