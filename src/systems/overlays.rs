//! Overlay render system.
//!
//! Draws every overlay of the world's
//! [`OverlayManager`](crate::overlays::OverlayManager) for one viewport.
//! The manager is a non-send resource; it is taken out of the world for the
//! duration of the draw so overlays can query the world mutably.

use bevy_ecs::prelude::*;

use crate::overlays::tracking::RefreshReport;
use crate::overlays::{FrameArgs, OverlayManager};
use crate::render::backend::RenderBackend;
use crate::render::viewport::Viewport;
use crate::resources::worldtime::WorldTime;

/// Refreshes and draws all overlays for `viewport` at the current world time.
///
/// Does nothing when the world has no `OverlayManager`.
pub fn overlay_render_system(
    world: &mut World,
    viewport: &Viewport,
    backend: &mut dyn RenderBackend,
) -> RefreshReport {
    let Some(mut overlays) = world.remove_non_send_resource::<OverlayManager>() else {
        return RefreshReport::default();
    };
    let frame = FrameArgs {
        viewport: *viewport,
        now: world.get_resource::<WorldTime>().map_or(0.0, |t| t.elapsed),
    };
    let report = overlays.draw(world, &frame, backend);
    world.insert_non_send_resource(overlays);
    report
}

/// Removes the `OverlayManager` from the world and releases everything it holds.
pub fn shutdown_overlays(world: &mut World, backend: &mut dyn RenderBackend) {
    if let Some(mut overlays) = world.remove_non_send_resource::<OverlayManager>() {
        overlays.shutdown(backend);
    }
}
