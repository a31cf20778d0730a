//! Deterministic terrain generation using FastNoiseLite
//!
//! Every pass reads only the chunk's own voxel array, its column key and the
//! world seed, so workers can generate chunks in any order on any thread and
//! still produce identical terrain.

use std::collections::VecDeque;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::IVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::*;
use crate::core::block::BlockType;
use crate::core::chunk::{Chunk, ColumnKey, Voxels};
use crate::core::cursor::BlockCursor;
use crate::error::GenerationError;

const HILL_AMPLITUDE: f32 = 14.0;
const MOUNTAIN_AMPLITUDE: f32 = 110.0;
const MOUNTAIN_SHARPNESS: f32 = 3.0;

const CAVE_THRESHOLD: f32 = 0.0;
const CAVE_BAND: f32 = 0.045;
const CAVE_VERTICAL_SQUASH: f32 = 1.6;
const CAVERN_THRESHOLD: f32 = 0.55;

const TREE_GATE: f32 = -0.1;
const TRUNK_MIN: i32 = 4;
const TRUNK_MAX: i32 = 7;

const FLOWER_CHANCE: f64 = 0.04;
const TALL_PLANT_CHANCE: f64 = 0.015;

const DIRT_POCKET_CHANCE: f64 = 0.0003;
const DIRT_POCKET_CONTINUATION: f64 = 0.09;
const DIRT_POCKET_MAX: usize = 48;

// RNG stream salts, one per randomized pass
const SALT_TREE: u64 = 1;
const SALT_ORE: u64 = 2;
const SALT_DIRT: u64 = 3;
const SALT_PLANTS: u64 = 4;

/// Vertical distribution of an ore's seed chance.
#[derive(Clone, Copy, Debug)]
enum OreRange {
    /// Chance grows linearly with depth below `max_y`.
    Below { max_y: i32 },
    /// Chance peaks at `center` and falls to zero `spread` blocks away.
    Band { center: i32, spread: i32 },
    /// Chance follows a low-frequency horizontal belt, any depth below `max_y`.
    Belt { max_y: i32 },
}

#[derive(Clone, Copy, Debug)]
struct OreVein {
    ty: BlockType,
    range: OreRange,
    chance: f64,
    continuation: f64,
    max_size: usize,
}

// Rarer ores seed less often but pack into smaller, denser veins.
const ORE_VEINS: [OreVein; 7] = [
    OreVein {
        ty: BlockType::CoalOre,
        range: OreRange::Below { max_y: 160 },
        chance: 0.004,
        continuation: 0.04,
        max_size: 16,
    },
    OreVein {
        ty: BlockType::IronOre,
        range: OreRange::Below { max_y: 96 },
        chance: 0.0025,
        continuation: 0.045,
        max_size: 10,
    },
    OreVein {
        ty: BlockType::LapisOre,
        range: OreRange::Band {
            center: 28,
            spread: 16,
        },
        chance: 0.0012,
        continuation: 0.05,
        max_size: 7,
    },
    OreVein {
        ty: BlockType::GoldOre,
        range: OreRange::Below { max_y: 40 },
        chance: 0.0012,
        continuation: 0.06,
        max_size: 7,
    },
    OreVein {
        ty: BlockType::RedstoneOre,
        range: OreRange::Below { max_y: 24 },
        chance: 0.002,
        continuation: 0.06,
        max_size: 8,
    },
    OreVein {
        ty: BlockType::DiamondOre,
        range: OreRange::Below { max_y: 18 },
        chance: 0.0008,
        continuation: 0.08,
        max_size: 5,
    },
    OreVein {
        ty: BlockType::EmeraldOre,
        range: OreRange::Belt { max_y: 100 },
        chance: 0.0006,
        continuation: 0.1,
        max_size: 3,
    },
];

/// Thread-safe terrain generator with pre-configured FastNoiseLite instances
pub struct TerrainGenerator {
    noise_hills: FastNoiseLite,
    noise_flatness: FastNoiseLite,
    noise_mountains: FastNoiseLite,
    noise_cave: FastNoiseLite,
    noise_cavern: FastNoiseLite,
    noise_trees: FastNoiseLite,
    noise_emerald: FastNoiseLite,
    pub seed: u32,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            noise_hills: Self::create_fbm_noise(seed, 0.02),
            noise_flatness: Self::create_noise(seed.wrapping_add(1), 0.004),
            noise_mountains: Self::create_fbm_noise(seed.wrapping_add(2), 0.0025),
            noise_cave: Self::create_3d_noise(seed.wrapping_add(3), 0.03),
            noise_cavern: Self::create_3d_noise(seed.wrapping_add(4), 0.012),
            noise_trees: Self::create_noise(seed.wrapping_add(5), 0.05),
            noise_emerald: Self::create_noise(seed.wrapping_add(6), 0.003),
            seed,
        }
    }

    fn create_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        noise
    }

    fn create_fbm_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise.set_frequency(Some(frequency));
        noise
    }

    fn create_3d_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2S));
        noise.set_frequency(Some(frequency));
        noise
    }

    /// Fills `chunk` in place. Fails if the chunk was already generated or disposed.
    pub fn generate(&self, chunk: &Chunk) -> Result<(), GenerationError> {
        if chunk.is_disposed() {
            return Err(GenerationError::Disposed(chunk.key()));
        }
        if chunk.has_generated() {
            return Err(GenerationError::AlreadyGenerated(chunk.key()));
        }
        let voxels = self.generate_voxels(chunk.key());
        chunk.commit_generated(voxels)
    }

    /// Pure form of [`generate`](Self::generate): same key and seed, same voxels.
    pub fn generate_voxels(&self, key: ColumnKey) -> Voxels {
        let mut voxels = Voxels::new();
        let origin = key.origin();

        let mut height_map = [[0i32; CHUNK_SIZE as usize]; CHUNK_SIZE as usize];
        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                height_map[lx as usize][lz as usize] =
                    self.surface_height(origin.x + lx, origin.z + lz);
            }
        }

        self.shape_surface(&mut voxels, &height_map);
        self.carve_caves(&mut voxels, origin, &height_map);
        repair_grass(&mut voxels);
        self.grow_tree(&mut voxels, key);
        self.seed_ores(&mut voxels, key);
        self.seed_dirt_pockets(&mut voxels, key);
        place_bedrock(&mut voxels);
        self.place_surface_plants(&mut voxels, key);
        light_columns(&mut voxels);

        voxels
    }

    /// First air layer above the shaped surface of a world column.
    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let fx = world_x as f32;
        let fz = world_z as f32;

        let hills = self.noise_hills.get_noise_2d(fx, fz);
        let flatness = (self.noise_flatness.get_noise_2d(fx, fz) + 1.0) * 0.5;
        let mountains = ((self.noise_mountains.get_noise_2d(fx, fz) + 1.0) * 0.5)
            .clamp(0.0, 1.0)
            .powf(MOUNTAIN_SHARPNESS);

        let height =
            SEA_LEVEL as f32 + hills * HILL_AMPLITUDE * flatness + mountains * MOUNTAIN_AMPLITUDE;
        (height as i32).clamp(DIRT_BAND + 2, CHUNK_HEIGHT - 32)
    }

    fn shape_surface(
        &self,
        voxels: &mut Voxels,
        height_map: &[[i32; CHUNK_SIZE as usize]; CHUNK_SIZE as usize],
    ) {
        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let surface = height_map[lx as usize][lz as usize];
                let grass_y = surface - 1;
                let dirt_from = grass_y - DIRT_BAND;

                for y in 0..surface {
                    let ty = if y < dirt_from {
                        BlockType::Stone
                    } else if y < grass_y {
                        BlockType::Dirt
                    } else {
                        BlockType::Grass
                    };
                    voxels.set_type(IVec3::new(lx, y, lz), ty);
                }
            }
        }
    }

    fn carve_caves(
        &self,
        voxels: &mut Voxels,
        origin: IVec3,
        height_map: &[[i32; CHUNK_SIZE as usize]; CHUNK_SIZE as usize],
    ) {
        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let fx = (origin.x + lx) as f32;
                let fz = (origin.z + lz) as f32;
                let surface = height_map[lx as usize][lz as usize];

                for y in 1..surface {
                    let fy = y as f32;
                    let tunnel = self.noise_cave.get_noise_3d(fx, fy * CAVE_VERTICAL_SQUASH, fz);
                    let is_tunnel = (tunnel - CAVE_THRESHOLD).abs() < CAVE_BAND;
                    let is_cavern = y < CAVERN_DEPTH
                        && self.noise_cavern.get_noise_3d(fx, fy, fz) > CAVERN_THRESHOLD;

                    if is_tunnel || is_cavern {
                        voxels.set_type(IVec3::new(lx, y, lz), BlockType::Air);
                    }
                }
            }
        }
    }

    fn grow_tree(&self, voxels: &mut Voxels, key: ColumnKey) {
        let mut rng = self.chunk_rng(key, SALT_TREE);
        let lx = rng.gen_range(0..CHUNK_SIZE);
        let lz = rng.gen_range(0..CHUNK_SIZE);
        let trunk_height = rng.gen_range(TRUNK_MIN..=TRUNK_MAX);

        let Some(ground) = voxels.top_solid(lx, lz) else {
            return;
        };
        if voxels.block_type(IVec3::new(lx, ground, lz)) != BlockType::Grass {
            return;
        }

        let origin = key.origin();
        let gate = self
            .noise_trees
            .get_noise_2d((origin.x + lx) as f32, (origin.z + lz) as f32);
        if gate < TREE_GATE {
            return;
        }

        place_tree(voxels, IVec3::new(lx, ground + 1, lz), trunk_height, &mut rng);
    }

    fn seed_ores(&self, voxels: &mut Voxels, key: ColumnKey) {
        let mut rng = self.chunk_rng(key, SALT_ORE);
        let origin = key.origin();

        for vein in ORE_VEINS {
            for y in 1..CHUNK_HEIGHT {
                for lz in 0..CHUNK_SIZE {
                    for lx in 0..CHUNK_SIZE {
                        let pos = IVec3::new(lx, y, lz);
                        if voxels.block_type(pos) != BlockType::Stone {
                            continue;
                        }
                        let chance = self.ore_chance(&vein, origin + pos);
                        if chance > 0.0 && rng.gen_bool(chance) {
                            flood_fill(
                                voxels,
                                pos,
                                BlockType::Stone,
                                vein.ty,
                                vein.continuation,
                                vein.max_size,
                                &mut rng,
                            );
                        }
                    }
                }
            }
        }
    }

    fn ore_chance(&self, vein: &OreVein, world: IVec3) -> f64 {
        let scale = match vein.range {
            OreRange::Below { max_y } => {
                if world.y >= max_y {
                    0.0
                } else {
                    (max_y - world.y) as f64 / max_y as f64
                }
            }
            OreRange::Band { center, spread } => {
                (1.0 - (world.y - center).abs() as f64 / spread as f64).max(0.0)
            }
            OreRange::Belt { max_y } => {
                if world.y >= max_y {
                    0.0
                } else {
                    let belt = self
                        .noise_emerald
                        .get_noise_2d(world.x as f32, world.z as f32);
                    ((belt as f64 - 0.4) / 0.6).clamp(0.0, 1.0)
                }
            }
        };
        (vein.chance * scale).clamp(0.0, 1.0)
    }

    fn seed_dirt_pockets(&self, voxels: &mut Voxels, key: ColumnKey) {
        let mut rng = self.chunk_rng(key, SALT_DIRT);

        for y in 1..CHUNK_HEIGHT {
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    let pos = IVec3::new(lx, y, lz);
                    if voxels.block_type(pos) == BlockType::Stone
                        && rng.gen_bool(DIRT_POCKET_CHANCE)
                    {
                        flood_fill(
                            voxels,
                            pos,
                            BlockType::Stone,
                            BlockType::Dirt,
                            DIRT_POCKET_CONTINUATION,
                            DIRT_POCKET_MAX,
                            &mut rng,
                        );
                    }
                }
            }
        }
    }

    fn place_surface_plants(&self, voxels: &mut Voxels, key: ColumnKey) {
        let mut rng = self.chunk_rng(key, SALT_PLANTS);

        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let roll: f64 = rng.gen_range(0.0..1.0);
                let variant = rng.gen_range(0..BlockType::FLOWERS.len());

                let Some(ground) = voxels.top_solid(lx, lz) else {
                    continue;
                };
                if voxels.block_type(IVec3::new(lx, ground, lz)) != BlockType::Grass {
                    continue;
                }
                let above = IVec3::new(lx, ground + 1, lz);
                let above2 = IVec3::new(lx, ground + 2, lz);

                if roll < FLOWER_CHANCE {
                    if voxels.get(above).is_some_and(|b| b.is_air()) {
                        voxels.set_type(above, BlockType::FLOWERS[variant]);
                    }
                } else if roll < FLOWER_CHANCE + TALL_PLANT_CHANCE
                    && voxels.get(above).is_some_and(|b| b.is_air())
                    && voxels.get(above2).is_some_and(|b| b.is_air())
                {
                    voxels.set_type(above, BlockType::TallPlantBottom);
                    voxels.set_type(above2, BlockType::TallPlantTop);
                }
            }
        }
    }

    /// Per-chunk, per-pass RNG. Never seeded from wall clock or thread state.
    fn chunk_rng(&self, key: ColumnKey, salt: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.column_hash(key, salt))
    }

    fn column_hash(&self, key: ColumnKey, salt: u64) -> u64 {
        let mut hash = self.seed as u64 ^ 0x9E37_79B9_7F4A_7C15;
        hash = (hash ^ key.x as u32 as u64).wrapping_mul(0x0000_0100_0000_01B3);
        hash = (hash ^ key.z as u32 as u64).wrapping_mul(0x0000_0100_0000_01B3);
        hash = (hash ^ salt).wrapping_mul(0x0000_0100_0000_01B3);
        hash ^ (hash >> 29)
    }
}

// Allow cloning for worker threads
impl Clone for TerrainGenerator {
    fn clone(&self) -> Self {
        TerrainGenerator::new(self.seed)
    }
}

/// Promotes dirt with air directly above it to grass.
fn repair_grass(voxels: &mut Voxels) {
    for lx in 0..CHUNK_SIZE {
        for lz in 0..CHUNK_SIZE {
            for y in 0..CHUNK_HEIGHT - 1 {
                let pos = IVec3::new(lx, y, lz);
                if voxels.block_type(pos) == BlockType::Dirt
                    && voxels.block_type(pos + IVec3::Y) == BlockType::Air
                {
                    voxels.set_type(pos, BlockType::Grass);
                }
            }
        }
    }
}

fn place_bedrock(voxels: &mut Voxels) {
    for lx in 0..CHUNK_SIZE {
        for lz in 0..CHUNK_SIZE {
            voxels.set_type(IVec3::new(lx, 0, lz), BlockType::Bedrock);
        }
    }
}

/// Vertical-only light: 15 from the sky down to the first solid voxel, 0 from there on.
fn light_columns(voxels: &mut Voxels) {
    for lx in 0..CHUNK_SIZE {
        for lz in 0..CHUNK_SIZE {
            let mut lit = true;
            for y in (0..CHUNK_HEIGHT).rev() {
                let pos = IVec3::new(lx, y, lz);
                if lit && voxels.block_type(pos).is_solid() {
                    lit = false;
                }
                voxels.set_light(pos, if lit { MAX_LIGHT } else { 0 });
            }
        }
    }
}

/// Trunk from `base` upward, a canopy voxel on top, then two rings of leaves.
/// The outer ring thins out as trunks get taller.
fn place_tree(voxels: &mut Voxels, base: IVec3, trunk_height: i32, rng: &mut ChaCha8Rng) {
    if base.y + trunk_height + 2 >= CHUNK_HEIGHT {
        return;
    }

    for dy in 0..trunk_height {
        voxels.set_type(base + IVec3::new(0, dy, 0), BlockType::Log);
    }

    let crown = base + IVec3::new(0, trunk_height, 0);
    let Some(mut cursor) = BlockCursor::new(voxels, crown) else {
        return;
    };
    cursor.set_type(BlockType::Leaves);

    let mut inner_ring = Vec::new();
    for pos in cursor.neighbors() {
        cursor.move_to(pos);
        if cursor.block_type() == BlockType::Air {
            cursor.set_type(BlockType::Leaves);
            inner_ring.push(pos);
        }
    }

    let outer_density =
        (0.75 - (trunk_height - TRUNK_MIN) as f64 * 0.12).clamp(0.2, 1.0);
    for leaf in inner_ring {
        cursor.move_to(leaf);
        for pos in cursor.neighbors() {
            cursor.move_to(pos);
            if cursor.block_type() == BlockType::Air && rng.gen_bool(outer_density) {
                cursor.set_type(BlockType::Leaves);
            }
        }
    }
}

/// Breadth-first spread of `to` through cells of type `from`, starting at `start`.
/// Each neighbor edge continues with probability `continuation`. Stays inside the chunk.
/// Returns the cells converted.
fn flood_fill(
    voxels: &mut Voxels,
    start: IVec3,
    from: BlockType,
    to: BlockType,
    continuation: f64,
    max_size: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<IVec3> {
    let mut converted = Vec::new();
    let Some(mut cursor) = BlockCursor::new(voxels, start) else {
        return converted;
    };
    if cursor.block_type() != from {
        return converted;
    }

    cursor.set_type(to);
    converted.push(start);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        cursor.move_to(current);
        for pos in cursor.neighbors() {
            if converted.len() >= max_size {
                return converted;
            }
            cursor.move_to(pos);
            if cursor.block_type() == from && rng.gen_bool(continuation) {
                cursor.set_type(to);
                converted.push(pos);
                queue.push_back(pos);
            }
        }
    }

    converted
}
