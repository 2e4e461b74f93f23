//! Overlay tracking integration tests: admission, refresh, eviction, shader
//! ownership, and draw output through the recording backend.

use bevy_ecs::prelude::*;
use glam::{Affine2, UVec2, Vec2};

use overlayfx::components::mapposition::{MapId, MapPosition};
use overlayfx::components::radiationpulse::RadiationPulse;
use overlayfx::components::salvagemagnet::{MagnetState, MagnetStateType, SalvageMagnet};
use overlayfx::overlays::OverlayManager;
use overlayfx::overlays::tracking::RefreshReport;
use overlayfx::render::backend::{RenderBackend, ShaderParam};
use overlayfx::render::geometry::{Box2, Box2Rotated};
use overlayfx::render::recording::RecordingBackend;
use overlayfx::render::viewport::{Eye, Viewport, ViewportId};
use overlayfx::resources::overlayconfig::OverlayConfig;
use overlayfx::resources::shaderstore::{RADIATION, RADIATION_DISTORTION, SALVAGE_BEAM, ShaderStore};
use overlayfx::resources::spatialindex::SpatialIndex;
use overlayfx::resources::worldtime::WorldTime;
use overlayfx::systems::overlays::{overlay_render_system, shutdown_overlays};
use overlayfx::systems::radiationpulse::radiation_pulse_expiry_system;
use overlayfx::systems::spatialindex::rebuild_spatial_index;
use overlayfx::systems::time::update_world_time;

const MAP: MapId = MapId(1);
const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_world() -> World {
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_non_send_resource(OverlayManager::from_config(&OverlayConfig::new()));
    world
}

fn viewport_at(x: f32, y: f32) -> Viewport {
    Viewport::new(
        ViewportId(0),
        UVec2::new(1280, 720),
        32.0,
        Some(Eye::new(MAP, Vec2::new(x, y))),
    )
}

fn spawn_pulse(world: &mut World, x: f32, y: f32, range: f32, duration: f32) -> Entity {
    world
        .spawn((
            RadiationPulse::new(range, 0.0, duration),
            MapPosition::new(MAP, x, y),
        ))
        .id()
}

fn holding(target: Entity) -> SalvageMagnet {
    let mut magnet = SalvageMagnet::new(Vec2::ZERO);
    magnet.attach(target, MagnetState::new(MagnetStateType::Holding, 100.0));
    magnet
}

fn pulses_tracked(world: &World) -> usize {
    world
        .non_send_resource::<OverlayManager>()
        .radiation()
        .map_or(0, |r| r.cache().len())
}

fn beams_tracked(world: &World) -> usize {
    world
        .non_send_resource::<OverlayManager>()
        .salvage_beam()
        .map_or(0, |b| b.cache().len())
}

fn frame(world: &mut World, backend: &mut RecordingBackend, viewport: &Viewport) -> RefreshReport {
    overlay_render_system(world, viewport, backend)
}

#[test]
fn pulse_near_eye_is_tracked_then_evicted_when_eye_moves_away() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 10.0, 10.0, 5.0, 10.0);

    let report = frame(&mut world, &mut backend, &viewport_at(12.0, 10.0));
    assert_eq!(report.admitted, 1);
    assert_eq!(pulses_tracked(&world), 1);
    assert_eq!(backend.live_shaders_of(RADIATION), 1);
    assert_eq!(backend.live_shaders_of(RADIATION_DISTORTION), 1);

    let report = frame(&mut world, &mut backend, &viewport_at(40.0, 10.0));
    assert_eq!(report.evicted, 1);
    assert_eq!(pulses_tracked(&world), 0);
    assert_eq!(backend.live_shaders(), 0);
    assert_eq!(backend.disposed(), 2);
    assert_eq!(backend.invalid_disposes(), 0);
}

#[test]
fn tracked_pulse_keeps_its_shaders_across_frames() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 10.0, 10.0, 5.0, 100.0);
    let viewport = viewport_at(12.0, 10.0);

    frame(&mut world, &mut backend, &viewport);
    for _ in 0..9 {
        update_world_time(&mut world, 0.1);
        let report = frame(&mut world, &mut backend, &viewport);
        assert_eq!(report.admitted, 0);
        assert_eq!(report.already_tracked, 1);
        assert_eq!(report.refreshed, 1);
    }

    assert_eq!(pulses_tracked(&world), 1);
    assert_eq!(backend.duplicated(), 2);
    assert_eq!(backend.disposed(), 0);
}

#[test]
fn despawned_pulse_releases_both_shaders_once() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let pulse = spawn_pulse(&mut world, 0.0, 0.0, 3.0, 100.0);
    let viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    world.despawn(pulse);
    let report = frame(&mut world, &mut backend, &viewport);
    frame(&mut world, &mut backend, &viewport);

    assert_eq!(report.evicted, 1);
    assert_eq!(pulses_tracked(&world), 0);
    assert_eq!(backend.disposed(), 2);
    assert_eq!(backend.invalid_disposes(), 0);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn pulse_on_another_map_is_not_tracked() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    world.spawn((
        RadiationPulse::new(5.0, 0.0, 100.0),
        MapPosition::new(MapId(2), 0.0, 0.0),
    ));

    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));
    assert_eq!(pulses_tracked(&world), 0);
    assert_eq!(backend.duplicated(), 0);
}

#[test]
fn pulse_moving_to_another_map_is_evicted() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let pulse = spawn_pulse(&mut world, 0.0, 0.0, 5.0, 100.0);
    let viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    world.get_mut::<MapPosition>(pulse).unwrap().map = MapId(2);
    let report = frame(&mut world, &mut backend, &viewport);

    assert_eq!(report.evicted, 1);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn shutdown_releases_everything() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 1.0, 1.0, 2.0, 100.0);
    spawn_pulse(&mut world, -3.0, 2.0, 4.0, 100.0);
    let target = world.spawn(MapPosition::new(MAP, 5.0, 5.0)).id();
    world.spawn((holding(target), MapPosition::new(MAP, 0.0, 0.0)));

    for _ in 0..5 {
        frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));
    }
    assert_eq!(backend.live_shaders(), 5);
    assert_eq!(backend.render_target_count(), 1);

    shutdown_overlays(&mut world, &mut backend);

    assert!(world.get_non_send_resource::<OverlayManager>().is_none());
    assert_eq!(backend.live_shaders(), 0);
    assert_eq!(backend.duplicated(), backend.disposed());
    assert_eq!(backend.invalid_disposes(), 0);
    assert_eq!(backend.render_target_count(), 0);
}

#[test]
fn removing_an_overlay_releases_its_entries() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);
    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    let mut manager = world
        .remove_non_send_resource::<OverlayManager>()
        .unwrap();
    assert!(manager.remove("radiation", &mut backend));
    assert!(!manager.remove("radiation", &mut backend));
    assert_eq!(backend.live_shaders(), 0);
    manager.shutdown(&mut backend);
}

#[test]
fn two_magnets_holding_the_same_target_get_separate_beams() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let target = world.spawn(MapPosition::new(MAP, 2.0, 3.0)).id();
    let a = world
        .spawn((holding(target), MapPosition::new(MAP, 0.0, 0.0)))
        .id();
    let b = world
        .spawn((holding(target), MapPosition::new(MAP, 4.0, 0.0)))
        .id();

    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    assert_eq!(beams_tracked(&world), 2);
    assert_eq!(backend.live_shaders_of(SALVAGE_BEAM), 2);
    let manager = world.non_send_resource::<OverlayManager>();
    let beams = manager.salvage_beam().unwrap().cache();
    let shader_a = beams.get(a).unwrap().shaders()[0].id();
    let shader_b = beams.get(b).unwrap().shaders()[0].id();
    assert_ne!(shader_a, shader_b);

    let drawn: Vec<_> = backend
        .commands()
        .iter()
        .filter(|c| c.shader == Some(shader_a) || c.shader == Some(shader_b))
        .collect();
    assert_eq!(drawn.len(), 2);
}

#[test]
fn beam_follows_moving_target_and_goes_away_on_detach() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let target = world.spawn(MapPosition::new(MAP, 2.0, 3.0)).id();
    let magnet = world
        .spawn((holding(target), MapPosition::new(MAP, 0.0, 0.0)))
        .id();
    let viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    world.get_mut::<MapPosition>(target).unwrap().pos = Vec2::new(-4.0, 1.0);
    frame(&mut world, &mut backend, &viewport);

    {
        let manager = world.non_send_resource::<OverlayManager>();
        let tracked = manager.salvage_beam().unwrap().cache().get(magnet).unwrap();
        assert_eq!(tracked.instance().to, Vec2::new(-4.0, 1.0));
        assert_eq!(tracked.instance().from, Vec2::ZERO);
    }
    assert_eq!(backend.duplicated(), 1);

    world
        .get_mut::<SalvageMagnet>(magnet)
        .unwrap()
        .detach(MagnetState::new(MagnetStateType::CoolingDown, 5.0));
    let report = frame(&mut world, &mut backend, &viewport);
    assert_eq!(report.evicted, 1);
    assert_eq!(beams_tracked(&world), 0);
    assert_eq!(backend.live_shaders_of(SALVAGE_BEAM), 0);
}

#[test]
fn beam_outside_the_view_is_not_tracked() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let target = world.spawn(MapPosition::new(MAP, 500.0, 500.0)).id();
    world.spawn((holding(target), MapPosition::new(MAP, 510.0, 500.0)));

    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));
    assert_eq!(beams_tracked(&world), 0);
}

#[test]
fn failed_duplication_is_retried_next_frame() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);
    let viewport = viewport_at(0.0, 0.0);

    backend.fail_prototype(RADIATION_DISTORTION);
    let report = frame(&mut world, &mut backend, &viewport);
    assert_eq!(report.failed, 1);
    assert_eq!(pulses_tracked(&world), 0);
    // The primary shader acquired before the failure was handed back.
    assert_eq!(backend.duplicated(), 1);
    assert_eq!(backend.live_shaders(), 0);

    backend.restore_prototype(RADIATION_DISTORTION);
    let report = frame(&mut world, &mut backend, &viewport);
    assert_eq!(report.admitted, 1);
    assert_eq!(pulses_tracked(&world), 1);
    assert_eq!(backend.live_shaders(), 2);
}

#[test]
fn missing_distortion_map_still_draws_the_glow() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);
    backend.set_targets_unavailable(true);

    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    assert_eq!(pulses_tracked(&world), 1);
    assert_eq!(backend.commands().len(), 1);
    assert_eq!(backend.commands()[0].target, None);
    assert!(backend.commands()[0].shader.is_some());
}

#[test]
fn one_failed_draw_does_not_stop_the_others() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 1.0, 0.0, 2.0, 100.0);
    spawn_pulse(&mut world, -1.0, 0.0, 2.0, 100.0);

    backend.fail_next_draws(1);
    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    assert_eq!(pulses_tracked(&world), 2);
    let on_screen = backend.commands().iter().filter(|c| c.target.is_none()).count();
    let distorted = backend.commands().iter().filter(|c| c.target.is_some()).count();
    assert_eq!(on_screen, 1);
    assert_eq!(distorted, 1);
    assert_eq!(backend.transform(), Affine2::IDENTITY);
    assert_eq!(backend.bound_shader(), None);
}

#[test]
fn draw_state_is_restored_after_every_frame() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let viewport = viewport_at(3.0, 4.0);

    frame(&mut world, &mut backend, &viewport);
    assert_eq!(backend.transform(), Affine2::IDENTITY);

    spawn_pulse(&mut world, 3.0, 4.0, 2.0, 100.0);
    frame(&mut world, &mut backend, &viewport);
    assert_eq!(backend.transform(), Affine2::IDENTITY);
    assert_eq!(backend.bound_shader(), None);
    assert!(
        backend
            .commands()
            .iter()
            .all(|c| c.transform == viewport.world_to_local_matrix())
    );
}

#[test]
fn losing_the_eye_releases_tracked_pulses() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);
    let mut viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    assert_eq!(pulses_tracked(&world), 1);

    viewport.eye = None;
    let report = frame(&mut world, &mut backend, &viewport);
    assert_eq!(report.evicted, 1);
    assert_eq!(pulses_tracked(&world), 0);
    assert_eq!(backend.live_shaders_of(RADIATION), 0);
    assert_eq!(backend.live_shaders_of(RADIATION_DISTORTION), 0);
}

#[test]
fn expired_pulse_is_despawned_and_evicted() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let pulse = spawn_pulse(&mut world, 0.0, 0.0, 2.0, 1.0);
    let viewport = viewport_at(0.0, 0.0);
    let mut schedule = Schedule::default();
    schedule.add_systems(radiation_pulse_expiry_system);

    frame(&mut world, &mut backend, &viewport);
    assert_eq!(pulses_tracked(&world), 1);

    update_world_time(&mut world, 0.5);
    schedule.run(&mut world);
    assert!(world.get_entity(pulse).is_ok());

    update_world_time(&mut world, 0.6);
    schedule.run(&mut world);
    assert!(world.get_entity(pulse).is_err());

    let report = frame(&mut world, &mut backend, &viewport);
    assert_eq!(report.evicted, 1);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn spatial_index_limits_candidates_to_the_eye_area() {
    let mut world = make_world();
    world.insert_resource(SpatialIndex::new(8.0));
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let near = spawn_pulse(&mut world, 2.0, 2.0, 2.0, 100.0);
    spawn_pulse(&mut world, 200.0, 200.0, 2.0, 100.0);
    world.spawn(MapPosition::new(MAP, 1.0, 1.0));

    let mut schedule = Schedule::default();
    schedule.add_systems(rebuild_spatial_index);
    schedule.run(&mut world);

    let report = frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));
    assert_eq!(report.admitted, 1);
    assert_eq!(pulses_tracked(&world), 1);
    let manager = world.non_send_resource::<OverlayManager>();
    assert!(manager.radiation().unwrap().cache().contains(near));
}

#[test]
fn pulse_shader_receives_position_range_and_life() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let pulse = spawn_pulse(&mut world, 10.0, 10.0, 5.0, 10.0);
    world.resource_mut::<WorldTime>().elapsed = 5.0;
    let viewport = viewport_at(12.0, 10.0);

    frame(&mut world, &mut backend, &viewport);

    let manager = world.non_send_resource::<OverlayManager>();
    let tracked = manager.radiation().unwrap().cache().get(pulse).unwrap();
    let primary = tracked.shaders()[0].id();
    let distortion = tracked.shaders()[1].id();
    assert_eq!(backend.shader_prototype(primary), Some(RADIATION));
    assert_eq!(backend.shader_prototype(distortion), Some(RADIATION_DISTORTION));

    for shader in [primary, distortion] {
        assert_eq!(backend.param(shader, "life"), Some(ShaderParam::Float(0.5)));
        assert_eq!(backend.param(shader, "range"), Some(ShaderParam::Float(5.0)));
        match backend.param(shader, "positionInput") {
            Some(ShaderParam::Vec2(p)) => {
                assert!(approx_eq(p.x, 576.0), "x = {}", p.x);
                assert!(approx_eq(p.y, 360.0), "y = {}", p.y);
            }
            other => panic!("unexpected positionInput {:?}", other),
        }
        assert_eq!(
            backend.param(shader, "renderScale"),
            Some(ShaderParam::Vec2(Vec2::ONE))
        );
    }

    let glow = backend
        .commands()
        .iter()
        .find(|c| c.shader == Some(primary))
        .unwrap();
    assert_eq!(glow.target, None);
    assert_eq!(
        glow.rect,
        Box2Rotated::axis_aligned(Box2::new(Vec2::new(5.0, 5.0), Vec2::new(15.0, 15.0)))
    );

    let distorted = backend
        .commands()
        .iter()
        .find(|c| c.shader == Some(distortion))
        .unwrap();
    let map = manager.distortion().unwrap().get(ViewportId(0)).unwrap();
    assert_eq!(distorted.target, Some(map.target));
    assert_eq!(map.size, UVec2::new(320, 180));
    assert_eq!(
        distorted.rect,
        Box2Rotated::axis_aligned(Box2::new(Vec2::new(1.25, 1.25), Vec2::new(3.75, 3.75)))
    );
}

#[test]
fn distortion_disabled_in_config_skips_the_second_pass() {
    let mut config = OverlayConfig::new();
    config.distortion = false;
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_non_send_resource(OverlayManager::from_config(&config));
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);

    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    assert_eq!(pulses_tracked(&world), 1);
    assert_eq!(backend.commands().len(), 1);
    assert_eq!(backend.render_target_count(), 0);
}

#[test]
fn beam_is_evicted_when_its_target_is_despawned() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let target = world.spawn(MapPosition::new(MAP, 2.0, 3.0)).id();
    world.spawn((holding(target), MapPosition::new(MAP, 0.0, 0.0)));
    let viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    assert_eq!(beams_tracked(&world), 1);

    world.despawn(target);
    let report = frame(&mut world, &mut backend, &viewport);
    frame(&mut world, &mut backend, &viewport);

    assert_eq!(report.evicted, 1);
    assert_eq!(beams_tracked(&world), 0);
    assert_eq!(backend.disposed(), 1);
    assert_eq!(backend.invalid_disposes(), 0);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn beam_is_evicted_when_its_target_loses_its_position() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    let target = world.spawn(MapPosition::new(MAP, 2.0, 3.0)).id();
    world.spawn((holding(target), MapPosition::new(MAP, 0.0, 0.0)));
    let viewport = viewport_at(0.0, 0.0);

    frame(&mut world, &mut backend, &viewport);
    world.entity_mut(target).remove::<MapPosition>();
    let report = frame(&mut world, &mut backend, &viewport);

    assert_eq!(report.evicted, 1);
    assert_eq!(beams_tracked(&world), 0);
    assert_eq!(backend.disposed(), 1);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn sources_without_a_position_are_never_admitted() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    world.spawn(RadiationPulse::new(5.0, 0.0, 100.0));
    let placed = world.spawn(MapPosition::new(MAP, 1.0, 1.0)).id();
    world.spawn(holding(placed));
    let unplaced = world.spawn_empty().id();
    world.spawn((holding(unplaced), MapPosition::new(MAP, 0.0, 0.0)));
    let viewport = viewport_at(0.0, 0.0);

    for _ in 0..3 {
        let report = frame(&mut world, &mut backend, &viewport);
        assert_eq!(report.admitted, 0);
        assert_eq!(report.failed, 0);
    }

    assert_eq!(pulses_tracked(&world), 0);
    assert_eq!(beams_tracked(&world), 0);
    assert_eq!(backend.duplicated(), 0);
    assert!(backend.commands().is_empty());
}

#[test]
fn huge_max_distance_with_spatial_index_tracks_every_pulse() {
    let mut config = OverlayConfig::new();
    config
        .load_from_str("[radiation]\nmax_distance = 1e12\n")
        .unwrap();
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_resource(SpatialIndex::new(8.0));
    world.insert_non_send_resource(OverlayManager::from_config(&config));
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 1.0, 1.0, 2.0, 100.0);
    spawn_pulse(&mut world, 5000.0, -3000.0, 2.0, 100.0);

    let mut schedule = Schedule::default();
    schedule.add_systems(rebuild_spatial_index);
    schedule.run(&mut world);

    let report = frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));
    assert_eq!(report.admitted, 2);
    assert_eq!(pulses_tracked(&world), 2);
    shutdown_overlays(&mut world, &mut backend);
    assert_eq!(backend.live_shaders(), 0);
}

#[test]
fn dropping_the_manager_without_shutdown_leaves_instances_allocated() {
    let mut world = make_world();
    let mut backend = RecordingBackend::new(ShaderStore::builtin());
    spawn_pulse(&mut world, 0.0, 0.0, 2.0, 100.0);
    frame(&mut world, &mut backend, &viewport_at(0.0, 0.0));

    drop(world.remove_non_send_resource::<OverlayManager>());

    assert_eq!(backend.live_shaders(), 2);
    assert_eq!(backend.disposed(), 0);
}
