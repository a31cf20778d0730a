use std::time::{Duration, Instant};

use glam::Vec3;
use minestream::{
    ColumnKey, GenerationPool, MeshPool, ResidentMeshes, StreamContext, StreamingSettings,
    TerrainGenerator, VERTICES_PER_FACE, WorkerSettings, World,
};

const SEED: u32 = 2024;

struct Pipeline {
    ctx: StreamContext,
    world: World,
    generation: GenerationPool,
    meshing: MeshPool,
    resident: ResidentMeshes,
}

impl Pipeline {
    fn start(render_distance: i32) -> Self {
        let workers = WorkerSettings {
            generation_threads: 2,
            mesh_threads: 2,
            poll_interval_ms: 5,
            ..Default::default()
        };
        let ctx = StreamContext::new(&workers);
        let generation = GenerationPool::spawn(&ctx, TerrainGenerator::new(SEED), 2).unwrap();
        let meshing = MeshPool::spawn(&ctx, 2).unwrap();
        let settings = StreamingSettings {
            render_distance,
            unload_margin: 1,
            ..Default::default()
        };
        let world = World::new(settings, ctx.clone());
        Pipeline {
            ctx,
            world,
            generation,
            meshing,
            resident: ResidentMeshes::new(),
        }
    }

    fn frame(&mut self, viewpoint: Vec3) {
        self.world.update(viewpoint);
        self.world.pump(viewpoint);
        self.resident.apply(self.ctx.render.drain());
    }

    /// Runs frames until `done` holds or the deadline passes.
    fn run_until(&mut self, viewpoint: Vec3, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(120);
        while Instant::now() < deadline {
            self.frame(viewpoint);
            if done(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn shutdown(self) {
        self.ctx.cancel();
        self.generation.join();
        self.meshing.join();
    }
}

#[test]
fn center_chunk_is_generated_and_meshed() {
    let mut pipeline = Pipeline::start(1);
    let viewpoint = Vec3::new(8.0, 120.0, 8.0);
    pipeline.world.initialize(viewpoint);
    assert_eq!(pipeline.world.len(), 9);

    let center = ColumnKey::new(0, 0);
    assert!(pipeline.run_until(viewpoint, |p| p.resident.get(center).is_some()));

    let chunk = pipeline.world.get(center).cloned().unwrap();
    assert!(chunk.has_generated());
    assert!(chunk.is_meshed());
    assert!(*chunk.voxels() == TerrainGenerator::new(SEED).generate_voxels(center));

    let mesh = pipeline.resident.get(center).unwrap();
    assert!(!mesh.opaque.is_empty());
    assert_eq!(mesh.opaque.len() % VERTICES_PER_FACE, 0);
    assert_eq!(mesh.transparent.len() % VERTICES_PER_FACE, 0);
    for vertex in &mesh.opaque {
        assert!(vertex.position[0] >= 0.0 && vertex.position[0] <= 16.0);
        assert!(vertex.position[2] >= 0.0 && vertex.position[2] <= 16.0);
    }

    pipeline.shutdown();
}

#[test]
fn edge_chunks_wait_for_missing_neighbors() {
    let mut pipeline = Pipeline::start(1);
    let viewpoint = Vec3::new(8.0, 120.0, 8.0);
    pipeline.world.initialize(viewpoint);

    assert!(pipeline.run_until(viewpoint, |p| {
        p.world
            .keys()
            .all(|key| p.world.get(key).is_some_and(|c| c.has_generated()))
            && p.resident.get(ColumnKey::new(0, 0)).is_some()
    }));

    // drain the last completions and give any stray mesh work time to show up
    for _ in 0..20 {
        pipeline.frame(viewpoint);
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(pipeline.world.countdowns_consistent());
    assert_eq!(pipeline.world.readiness(ColumnKey::new(1, 1)), Some(2));
    assert_eq!(pipeline.world.readiness(ColumnKey::new(1, 0)), Some(1));
    assert_eq!(pipeline.resident.len(), 1);
    for key in pipeline.world.keys() {
        let chunk = pipeline.world.get(key).unwrap();
        assert!(chunk.has_generated());
        assert_eq!(chunk.is_meshed(), key == ColumnKey::new(0, 0));
    }

    pipeline.shutdown();
}

#[test]
fn walking_streams_new_columns_and_disposes_old_ones() {
    let mut pipeline = Pipeline::start(2);
    let start = Vec3::new(8.0, 120.0, 8.0);
    pipeline.world.initialize(start);
    assert!(pipeline.run_until(start, |p| p.resident.len() == 9));

    let far_away = Vec3::new(8.0 + 16.0 * 6.0, 120.0, 8.0);
    assert!(pipeline.run_until(far_away, |p| {
        p.resident.get(ColumnKey::new(6, 0)).is_some()
    }));

    assert_eq!(pipeline.world.current_chunk(), Some(ColumnKey::new(6, 0)));
    assert!(!pipeline.world.contains(ColumnKey::new(0, 0)));
    assert!(pipeline.resident.get(ColumnKey::new(0, 0)).is_none());
    assert!(pipeline.resident.disposals() > 0);
    assert!(pipeline.world.countdowns_consistent());

    pipeline.shutdown();
}
