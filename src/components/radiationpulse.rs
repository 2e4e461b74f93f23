//! Radiation pulse component.
//!
//! A [`RadiationPulse`] marks an entity as the source of a short-lived radial
//! glow. The pulse has a fixed time window in simulation seconds (the same
//! clock as [`WorldTime::elapsed`](crate::resources::worldtime::WorldTime)) and
//! a range in world units.
//!
//! # Related
//!
//! - [`crate::overlays::radiation`] – tracks pulses near the eye and draws them
//! - [`crate::systems::radiationpulse::radiation_pulse_expiry_system`] – despawns
//!   pulses once their window has ended

use bevy_ecs::prelude::Component;

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct RadiationPulse {
    /// Radius of the glow in world units.
    pub range: f32,
    /// Simulation time the pulse started at.
    pub start_time: f32,
    /// Simulation time the pulse ends at.
    pub end_time: f32,
}

impl RadiationPulse {
    /// Create a pulse starting at `start_time` and lasting `duration` seconds.
    pub fn new(range: f32, start_time: f32, duration: f32) -> Self {
        Self {
            range,
            start_time,
            end_time: start_time + duration,
        }
    }

    /// Elapsed fraction of the pulse window, clamped to `[0, 1]`.
    pub fn normalized_lifetime(&self, now: f32) -> f32 {
        normalized_lifetime(self.start_time, self.end_time, now)
    }

    pub fn is_expired(&self, now: f32) -> bool {
        now >= self.end_time
    }
}

/// Elapsed fraction of the window `[start, end]` at time `now`, clamped to
/// `[0, 1]`. A degenerate window (`end <= start`) is always complete.
pub fn normalized_lifetime(start: f32, end: f32, now: f32) -> f32 {
    let span = end - start;
    if span <= 0.0 {
        return 1.0;
    }
    ((now - start) / span).clamp(0.0, 1.0)
}
