//! Radiation pulse expiry system.
//!
//! Pulses are fire-and-forget: once `WorldTime::elapsed` reaches a pulse's
//! `end_time` its entity is despawned. The radiation overlay notices the
//! missing entity on its next refresh and releases the pulse's shaders.

use bevy_ecs::prelude::*;

use crate::components::radiationpulse::RadiationPulse;
use crate::resources::worldtime::WorldTime;

/// Despawns every pulse whose time window has ended.
pub fn radiation_pulse_expiry_system(
    world_time: Res<WorldTime>,
    query: Query<(Entity, &RadiationPulse)>,
    mut commands: Commands,
) {
    let now = world_time.elapsed;
    for (entity, pulse) in query.iter() {
        if pulse.is_expired(now) {
            commands.entity(entity).try_despawn();
        }
    }
}
