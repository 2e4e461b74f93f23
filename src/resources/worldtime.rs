//! Simulation clock.
//!
//! [`WorldTime::elapsed`] is the timestamp overlays use for effect windows.
//! It only changes in [`update_world_time`](crate::systems::time::update_world_time),
//! so it is consistent for everything that runs within one frame.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    /// Scaled seconds since the simulation started.
    pub elapsed: f32,
    /// Scaled seconds of the last frame.
    pub delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}
