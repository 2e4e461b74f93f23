//! Shader instance pool.
//!
//! [`ShaderPool`] duplicates shared shader prototypes into [`OwnedShader`]
//! handles and disposes them again. An `OwnedShader` has exactly one owner and
//! is not `Clone`; it goes back through [`ShaderPool::release`].
//!
//! A handle dropped without an explicit release (an overlay torn down
//! mid-frame, a panic unwinding through a draw) sends its id back over a
//! channel. [`ShaderPool::reclaim`] disposes those ids, so every acquisition is
//! matched by exactly one dispose.

use arrayvec::ArrayVec;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::sync::Arc;

use crate::render::backend::{RenderBackend, RenderError, ShaderId};

/// Most shader instances a single tracked effect holds.
pub const MAX_SHADERS_PER_EFFECT: usize = 2;

/// The shader instances owned by one tracked effect.
pub type ShaderSet = ArrayVec<OwnedShader, MAX_SHADERS_PER_EFFECT>;

/// An exclusively owned shader instance.
#[derive(Debug)]
pub struct OwnedShader {
    id: ShaderId,
    prototype: Arc<str>,
    returns: Option<Sender<ShaderId>>,
}

impl OwnedShader {
    pub fn id(&self) -> ShaderId {
        self.id
    }
}

impl Drop for OwnedShader {
    fn drop(&mut self) {
        if let Some(tx) = self.returns.take() {
            debug!(
                target: "overlay",
                "Shader {:?} ({}) dropped without release, queued for reclaim",
                self.id, self.prototype
            );
            // The pool is gone if the send fails; nothing is left to dispose with.
            let _ = tx.send(self.id);
        }
    }
}

pub struct ShaderPool {
    returns_tx: Sender<ShaderId>,
    returns_rx: Receiver<ShaderId>,
    acquired: u64,
    released: u64,
}

impl ShaderPool {
    pub fn new() -> Self {
        let (returns_tx, returns_rx) = unbounded();
        Self {
            returns_tx,
            returns_rx,
            acquired: 0,
            released: 0,
        }
    }

    /// Duplicates the named prototype into a new owned instance.
    pub fn acquire(
        &mut self,
        backend: &mut dyn RenderBackend,
        prototype: &str,
    ) -> Result<OwnedShader, RenderError> {
        let id = backend.duplicate_shader(prototype)?;
        self.acquired += 1;
        Ok(OwnedShader {
            id,
            prototype: Arc::from(prototype),
            returns: Some(self.returns_tx.clone()),
        })
    }

    /// Acquires one instance per prototype, or none at all.
    ///
    /// When any duplication fails, the instances already acquired for this
    /// set are released before the error is returned. More than
    /// [`MAX_SHADERS_PER_EFFECT`] prototypes is an error and acquires nothing.
    pub fn acquire_set(
        &mut self,
        backend: &mut dyn RenderBackend,
        prototypes: &[&str],
    ) -> Result<ShaderSet, RenderError> {
        if prototypes.len() > MAX_SHADERS_PER_EFFECT {
            return Err(RenderError::TooManyShaders {
                requested: prototypes.len(),
                max: MAX_SHADERS_PER_EFFECT,
            });
        }
        let mut set = ShaderSet::new();
        for prototype in prototypes {
            match self.acquire(backend, prototype) {
                Ok(shader) => set.push(shader),
                Err(e) => {
                    self.release_set(backend, set);
                    return Err(e);
                }
            }
        }
        Ok(set)
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend, mut shader: OwnedShader) {
        shader.returns = None;
        backend.dispose_shader(shader.id);
        self.released += 1;
    }

    pub fn release_set(&mut self, backend: &mut dyn RenderBackend, set: ShaderSet) {
        for shader in set {
            self.release(backend, shader);
        }
    }

    /// Disposes instances whose owners were dropped without a release.
    /// Returns how many were reclaimed.
    pub fn reclaim(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let mut count = 0;
        while let Ok(id) = self.returns_rx.try_recv() {
            backend.dispose_shader(id);
            self.released += 1;
            count += 1;
        }
        if count > 0 {
            warn!(target: "overlay", "Reclaimed {} leaked shader instance(s)", count);
        }
        count
    }

    pub fn acquired(&self) -> u64 {
        self.acquired
    }

    pub fn released(&self) -> u64 {
        self.released
    }

    /// Instances acquired and not yet disposed, including ones waiting for reclaim.
    pub fn live(&self) -> u64 {
        self.acquired - self.released
    }
}

impl Default for ShaderPool {
    fn default() -> Self {
        Self::new()
    }
}
