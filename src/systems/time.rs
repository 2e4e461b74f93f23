//! Simulation clock update.
//!
//! Advances [`WorldTime`](crate::resources::worldtime::WorldTime) once per
//! frame. Effect windows are measured against `elapsed`, so it never runs
//! backwards: a negative frame delta is treated as zero.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance the clock by `dt` unscaled seconds, scaled by `time_scale`.
pub fn update_world_time(world: &mut World, dt: f32) {
    let mut time = world.resource_mut::<WorldTime>();
    let step = (dt * time.time_scale).max(0.0);
    time.elapsed += step;
    time.delta = step;
    time.frame_count += 1;
}
