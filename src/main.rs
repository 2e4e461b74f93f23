//! Overlayfx demo entry point.
//!
//! Runs a small scene of radiation pulses and salvage magnets and draws their
//! overlays through either the recording backend (headless) or raylib
//! (feature `raylib`).
//!
//! # Main Loop
//!
//! 1. Load `config.ini` and the shader manifest, falling back to defaults
//! 2. Spawn the demo scene and insert the [`OverlayManager`]
//! 3. Each frame: advance time, run the simulation schedule, draw overlays
//! 4. Shut the overlays down so every shader instance is released
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --headless --frames 600
//! cargo run --release --features raylib
//! ```

use bevy_ecs::prelude::*;
use clap::Parser;
use glam::{UVec2, Vec2};
use log::{info, warn};
use std::path::PathBuf;

use overlayfx::game::{DEMO_MAP, DemoSettings, demo_eye_position, demo_schedule, setup_demo};
use overlayfx::overlays::OverlayManager;
use overlayfx::render::recording::RecordingBackend;
use overlayfx::render::viewport::{Eye, Viewport, ViewportId};
use overlayfx::resources::overlayconfig::OverlayConfig;
use overlayfx::resources::shaderstore::ShaderStore;
use overlayfx::resources::worldtime::WorldTime;
use overlayfx::systems::overlays::{overlay_render_system, shutdown_overlays};
use overlayfx::systems::time::update_world_time;

const HEADLESS_DT: f32 = 1.0 / 60.0;

/// Radiation and salvage beam overlay demo
#[derive(Parser)]
#[command(version, about = "Timed visual-effect overlays for radiation pulses and salvage beams")]
struct Cli {
    /// Configuration file to load.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    /// Run without a window, recording draw calls instead.
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode.
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Radiation pulses kept alive in the scene.
    #[arg(long, default_value_t = 12)]
    pulses: usize,

    /// Salvage magnets in the scene.
    #[arg(long, default_value_t = 3)]
    magnets: usize,

    /// Seed for pulse placement.
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = OverlayConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{}; using default configuration", e);
    }

    let shaders = match &config.shader_manifest {
        Some(path) => ShaderStore::load_manifest(path).unwrap_or_else(|e| {
            warn!("{}; using built-in shaders", e);
            ShaderStore::builtin()
        }),
        None => ShaderStore::builtin(),
    };
    info!("{} shader prototype(s) available", shaders.len());

    let mut world = World::new();
    setup_demo(
        &mut world,
        &DemoSettings {
            pulses: cli.pulses,
            magnets: cli.magnets,
            seed: cli.seed,
        },
    );
    world.insert_non_send_resource(OverlayManager::from_config(&config));
    world.insert_resource(config.clone());

    let viewport = Viewport::new(
        ViewportId(0),
        UVec2::new(config.viewport_width, config.viewport_height),
        config.pixels_per_unit,
        Some(Eye::new(DEMO_MAP, Vec2::ZERO)),
    );

    #[cfg(feature = "raylib")]
    if !cli.headless {
        run_windowed(world, viewport, shaders);
        return;
    }
    #[cfg(not(feature = "raylib"))]
    if !cli.headless {
        warn!("Built without the `raylib` feature; running headless");
    }

    run_headless(world, viewport, shaders, cli.frames);
}

fn follow_eye(world: &World, viewport: &mut Viewport) {
    let now = world.get_resource::<WorldTime>().map_or(0.0, |t| t.elapsed);
    if let Some(eye) = viewport.eye.as_mut() {
        eye.position = demo_eye_position(now);
    }
}

fn run_headless(mut world: World, mut viewport: Viewport, shaders: ShaderStore, frames: u64) {
    let mut backend = RecordingBackend::new(shaders);
    let mut schedule = demo_schedule();

    for frame in 0..frames {
        update_world_time(&mut world, HEADLESS_DT);
        schedule.run(&mut world);
        follow_eye(&world, &mut viewport);

        let report = overlay_render_system(&mut world, &viewport, &mut backend);
        let draws = backend.take_commands().len();
        if frame % 60 == 0 {
            info!(
                "frame {}: {} draw call(s), {} admitted, {} refreshed, {} evicted, {} failed, {} live shader instance(s)",
                frame,
                draws,
                report.admitted,
                report.refreshed,
                report.evicted,
                report.failed,
                backend.live_shaders()
            );
        }
    }

    shutdown_overlays(&mut world, &mut backend);
    info!(
        "Headless run finished: {} shader instance(s) duplicated, {} disposed, {} still live",
        backend.duplicated(),
        backend.disposed(),
        backend.live_shaders()
    );
}

#[cfg(feature = "raylib")]
fn run_windowed(mut world: World, mut viewport: Viewport, shaders: ShaderStore) {
    use overlayfx::render::raylib_backend::RaylibBackend;

    let (mut rl, thread) = raylib::init()
        .size(viewport.size.x as i32, viewport.size.y as i32)
        .resizable()
        .title("overlayfx")
        .build();
    rl.set_target_fps(60);

    let mut backend = RaylibBackend::new(shaders);
    let mut schedule = demo_schedule();

    while !rl.window_should_close() {
        let dt = rl.get_frame_time();
        update_world_time(&mut world, dt);
        schedule.run(&mut world);
        world.clear_trackers();

        viewport.size = UVec2::new(
            rl.get_screen_width().max(1) as u32,
            rl.get_screen_height().max(1) as u32,
        );
        follow_eye(&world, &mut viewport);

        let mut d = rl.begin_drawing(&thread);
        {
            use raylib::prelude::RaylibDraw;
            d.clear_background(raylib::prelude::Color::BLACK);
        }
        overlay_render_system(&mut world, &viewport, &mut backend);
        drop(d);
    }

    shutdown_overlays(&mut world, &mut backend);
}
