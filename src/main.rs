//! Headless terrain streamer
//!
//! Walks a viewpoint across the world, pumping the controller once per frame
//! and draining the render queue the way a renderer would.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::{Mat4, Vec3};

use minestream::{
    GenerationPool, MeshPool, ResidentMeshes, StreamContext, TerrainGenerator, World,
    WorldSettings,
};

const EYE_ABOVE_GROUND: f32 = 20.0;
const STATS_EVERY: u32 = 60;

/// Streams procedurally generated voxel terrain around a moving viewpoint
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (JSON). Missing files fall back to defaults
    #[arg(long, default_value = "world_settings.json")]
    settings: PathBuf,

    /// World seed, overrides the settings file
    #[arg(long)]
    seed: Option<u32>,

    /// Render distance in chunks, overrides the settings file
    #[arg(long)]
    render_distance: Option<i32>,

    /// Number of simulated frames
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Viewpoint speed along +X in blocks per frame
    #[arg(long, default_value_t = 0.5)]
    speed: f32,

    /// Frame duration in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_millis: u64,

    /// Re-dispatch all mesh work every N frames (0 disables)
    #[arg(long, default_value_t = 0)]
    reload_every: u32,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    save_settings: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        tracing::error!("Streamer failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = WorldSettings::load_or_default(&args.settings);
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(render_distance) = args.render_distance {
        settings.streaming.render_distance = render_distance;
    }
    settings.validate()?;
    if args.save_settings {
        settings.save(&args.settings)?;
    }

    tracing::info!(
        "Starting streamer: seed {}, render distance {}",
        settings.seed,
        settings.streaming.render_distance
    );

    let ctx = StreamContext::new(&settings.workers);
    let generation = GenerationPool::spawn(
        &ctx,
        TerrainGenerator::new(settings.seed),
        settings.workers.generation_thread_count(),
    )?;
    let meshing = MeshPool::spawn(&ctx, settings.workers.mesh_thread_count())?;

    let mut world = World::new(settings.streaming.clone(), ctx.clone());
    let mut resident = ResidentMeshes::new();

    let ground = TerrainGenerator::new(settings.seed).surface_height(0, 0) as f32;
    let mut viewpoint = Vec3::new(0.5, ground + EYE_ABOVE_GROUND, 0.5);
    world.initialize(viewpoint);

    let proj = Mat4::perspective_rh(70f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
    let frame_time = Duration::from_millis(args.frame_millis);
    let started = Instant::now();

    for frame in 1..=args.frames {
        viewpoint.x += args.speed;
        world.update(viewpoint);
        world.pump(viewpoint);
        resident.apply(ctx.render.drain());

        if args.reload_every > 0 && frame % args.reload_every == 0 {
            world.reload();
        }

        if frame % STATS_EVERY == 0 {
            let view = Mat4::look_at_rh(viewpoint, viewpoint + Vec3::X, Vec3::Y);
            let visible = world.visible_chunks(&(proj * view), viewpoint);
            let (generation_backlog, mesh_backlog) = world.backlog();
            tracing::info!(
                "frame {}: {} loaded, {} meshed, {} visible, {} vertices, backlog {}/{}",
                frame,
                world.len(),
                resident.len(),
                visible.len(),
                resident.vertex_count(),
                generation_backlog,
                mesh_backlog
            );
        }

        std::thread::sleep(frame_time);
    }

    tracing::info!(
        "Finished {} frames in {:.1?}: {} uploads, {} disposals, {} chunks resident",
        args.frames,
        started.elapsed(),
        resident.uploads(),
        resident.disposals(),
        resident.len()
    );

    ctx.cancel();
    generation.join();
    meshing.join();
    Ok(())
}
