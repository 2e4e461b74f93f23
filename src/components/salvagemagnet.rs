//! Salvage magnet component.
//!
//! A [`SalvageMagnet`] pulls a salvage entity in and holds it. While an entity
//! is attached, the salvage beam overlay draws a beam from the magnet to it.
//!
//! The magnet's [`MagnetState`] is plain data here. Whatever drives the
//! attach/hold/detach cycle writes it; the overlay only looks at
//! [`SalvageMagnet::attached_entity`].

use bevy_ecs::prelude::{Component, Entity};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Phase of a magnet's timed cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagnetStateType {
    #[default]
    Inactive,
    Attaching,
    Holding,
    Detaching,
    CoolingDown,
}

/// A magnet phase together with the simulation time it lasts until.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagnetState {
    pub state_type: MagnetStateType,
    pub until: f32,
}

impl MagnetState {
    pub const INACTIVE: MagnetState = MagnetState {
        state_type: MagnetStateType::Inactive,
        until: 0.0,
    };

    pub fn new(state_type: MagnetStateType, until: f32) -> Self {
        Self { state_type, until }
    }

    /// Whether the phase's deadline has been reached at `now`.
    pub fn elapsed(&self, now: f32) -> bool {
        now >= self.until
    }
}

impl Default for MagnetState {
    fn default() -> Self {
        Self::INACTIVE
    }
}

#[derive(Component, Clone, Debug, Default)]
pub struct SalvageMagnet {
    /// Offset relative to the magnet where salvage is placed.
    pub offset: Vec2,
    /// The entity currently held by the magnet, if any.
    pub attached_entity: Option<Entity>,
    pub magnet_state: MagnetState,
}

impl SalvageMagnet {
    pub fn new(offset: Vec2) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn attach(&mut self, target: Entity, state: MagnetState) {
        self.attached_entity = Some(target);
        self.magnet_state = state;
    }

    pub fn detach(&mut self, state: MagnetState) {
        self.attached_entity = None;
        self.magnet_state = state;
    }
}
