//! Demo scene for the `overlayfx` binary.
//!
//! Spawns a field of radiation pulses and a few salvage magnets, each with a
//! piece of salvage it periodically pulls in and lets go. The eye orbits the
//! origin so pulses keep entering and leaving range.
//!
//! The magnet cycle here is a stand-in for a real magnet driver: it only
//! writes [`SalvageMagnet`] state, which the beam overlay reads.

use bevy_ecs::prelude::*;
use glam::Vec2;

use crate::components::mapposition::{MapId, MapPosition};
use crate::components::radiationpulse::RadiationPulse;
use crate::components::salvagemagnet::{MagnetState, MagnetStateType, SalvageMagnet};
use crate::resources::spatialindex::SpatialIndex;
use crate::resources::worldtime::WorldTime;
use crate::systems::radiationpulse::radiation_pulse_expiry_system;
use crate::systems::spatialindex::rebuild_spatial_index;

/// The only map the demo uses.
pub const DEMO_MAP: MapId = MapId(1);

const FIELD_HALF_SIZE: f32 = 30.0;
const EYE_ORBIT_RADIUS: f32 = 20.0;
const EYE_ORBIT_SPEED: f32 = 0.2;
const MAGNET_SPACING: f32 = 12.0;
const SALVAGE_DISTANCE: f32 = 8.0;

#[derive(Resource, Clone, Debug)]
pub struct DemoSettings {
    /// Number of pulses kept alive.
    pub pulses: usize,
    pub magnets: usize,
    pub seed: u64,
}

#[derive(Resource)]
pub struct DemoRng(pub fastrand::Rng);

/// Marks salvage and remembers which magnet it belongs to.
#[derive(Component, Clone, Copy, Debug)]
pub struct Salvage {
    pub magnet: Entity,
}

/// The salvage a demo magnet cycles on.
#[derive(Component, Clone, Copy, Debug)]
pub struct DemoSalvage(pub Entity);

/// Inserts the demo resources and spawns magnets with their salvage.
pub fn setup_demo(world: &mut World, settings: &DemoSettings) {
    world.insert_resource(WorldTime::default());
    world.insert_resource(SpatialIndex::default());
    world.insert_resource(DemoRng(fastrand::Rng::with_seed(settings.seed)));
    world.insert_resource(settings.clone());

    for i in 0..settings.magnets {
        let x = (i as f32 - (settings.magnets as f32 - 1.0) * 0.5) * MAGNET_SPACING;
        let magnet = world
            .spawn((
                SalvageMagnet::new(Vec2::new(0.0, SALVAGE_DISTANCE)),
                MapPosition::new(DEMO_MAP, x, -SALVAGE_DISTANCE * 0.5),
            ))
            .id();
        let salvage = world
            .spawn((
                Salvage { magnet },
                MapPosition::new(DEMO_MAP, x, SALVAGE_DISTANCE * 0.5),
            ))
            .id();
        world.entity_mut(magnet).insert(DemoSalvage(salvage));
    }
}

/// Where the eye is at simulation time `t`.
pub fn demo_eye_position(t: f32) -> Vec2 {
    Vec2::from_angle(t * EYE_ORBIT_SPEED) * EYE_ORBIT_RADIUS
}

/// Keeps the number of live pulses at `DemoSettings::pulses`.
pub fn demo_pulse_spawner(
    mut rng: ResMut<DemoRng>,
    time: Res<WorldTime>,
    settings: Res<DemoSettings>,
    pulses: Query<(), With<RadiationPulse>>,
    mut commands: Commands,
) {
    let rng = &mut rng.0;
    for _ in pulses.iter().count()..settings.pulses {
        let x = (rng.f32() * 2.0 - 1.0) * FIELD_HALF_SIZE;
        let y = (rng.f32() * 2.0 - 1.0) * FIELD_HALF_SIZE;
        let range = 2.0 + rng.f32() * 4.0;
        let duration = 2.0 + rng.f32() * 4.0;
        commands.spawn((
            RadiationPulse::new(range, time.elapsed, duration),
            MapPosition::new(DEMO_MAP, x, y),
        ));
    }
}

/// Steps each magnet through attach, hold, detach, and cool down.
pub fn demo_magnet_cycle(
    time: Res<WorldTime>,
    mut magnets: Query<(&mut SalvageMagnet, &DemoSalvage)>,
) {
    let now = time.elapsed;
    for (mut magnet, salvage) in magnets.iter_mut() {
        if !magnet.magnet_state.elapsed(now) {
            continue;
        }
        match magnet.magnet_state.state_type {
            MagnetStateType::Inactive => {
                magnet.attach(salvage.0, MagnetState::new(MagnetStateType::Attaching, now + 1.0));
            }
            MagnetStateType::Attaching => {
                magnet.magnet_state = MagnetState::new(MagnetStateType::Holding, now + 4.0);
            }
            MagnetStateType::Holding => {
                magnet.magnet_state = MagnetState::new(MagnetStateType::Detaching, now + 1.0);
            }
            MagnetStateType::Detaching => {
                magnet.detach(MagnetState::new(MagnetStateType::CoolingDown, now + 2.0));
            }
            MagnetStateType::CoolingDown => {
                magnet.magnet_state = MagnetState::INACTIVE;
            }
        }
    }
}

/// Sways attached salvage sideways so beams visibly follow it.
pub fn demo_salvage_sway(
    time: Res<WorldTime>,
    magnets: Query<(&SalvageMagnet, &MapPosition), Without<Salvage>>,
    mut salvage: Query<(&Salvage, &mut MapPosition)>,
) {
    for (piece, mut position) in salvage.iter_mut() {
        let Ok((magnet, anchor)) = magnets.get(piece.magnet) else {
            continue;
        };
        let sway = if magnet.attached_entity.is_some() {
            (time.elapsed * 2.0).sin()
        } else {
            0.0
        };
        position.pos = anchor.pos + magnet.offset + Vec2::new(sway, 0.0);
    }
}

/// Per-frame schedule of the demo simulation.
pub fn demo_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(radiation_pulse_expiry_system);
    schedule.add_systems(demo_pulse_spawner.after(radiation_pulse_expiry_system));
    schedule.add_systems(demo_magnet_cycle);
    schedule.add_systems(demo_salvage_sway.after(demo_magnet_cycle));
    schedule.add_systems(
        rebuild_spatial_index
            .after(demo_pulse_spawner)
            .after(demo_salvage_sway),
    );
    schedule
}
