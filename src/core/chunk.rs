use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::{IVec3, Vec2, Vec3};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::block::{Block, BlockType};
use crate::error::{GenerationError, WorldError};
use crate::render::frustum::AABB;

/// Column identifier in chunk units. The world-space origin is `key * 16`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ColumnKey {
    pub x: i32,
    pub z: i32,
}

impl ColumnKey {
    pub const fn new(x: i32, z: i32) -> Self {
        ColumnKey { x, z }
    }

    /// Column containing a world-space point.
    pub fn containing(position: Vec3) -> Self {
        ColumnKey {
            x: (position.x / CHUNK_SIZE as f32).floor() as i32,
            z: (position.z / CHUNK_SIZE as f32).floor() as i32,
        }
    }

    pub fn containing_block(position: IVec3) -> Self {
        ColumnKey {
            x: position.x.div_euclid(CHUNK_SIZE),
            z: position.z.div_euclid(CHUNK_SIZE),
        }
    }

    pub fn origin(self) -> IVec3 {
        IVec3::new(self.x * CHUNK_SIZE, 0, self.z * CHUNK_SIZE)
    }

    /// Horizontal center of the column in world units.
    pub fn center(self) -> Vec2 {
        let half = CHUNK_SIZE as f32 * 0.5;
        Vec2::new(
            (self.x * CHUNK_SIZE) as f32 + half,
            (self.z * CHUNK_SIZE) as f32 + half,
        )
    }

    /// Squared horizontal distance from the column center to `viewpoint`.
    pub fn distance_sq(self, viewpoint: Vec3) -> f32 {
        self.center().distance_squared(Vec2::new(viewpoint.x, viewpoint.z))
    }

    pub fn neighbor(self, side: Side) -> ColumnKey {
        let (dx, dz) = side.offset();
        ColumnKey::new(self.x + dx, self.z + dz)
    }
}

/// The four horizontal neighbor relations of a chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Side {
    /// -X
    Left,
    /// +X
    Right,
    /// +Z
    Front,
    /// -Z
    Back,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Front, Side::Back];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Side::Left => (-1, 0),
            Side::Right => (1, 0),
            Side::Front => (0, 1),
            Side::Back => (0, -1),
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

/// Dense voxel storage for one chunk, indexed `x + 16 * (z + 16 * y)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Voxels {
    blocks: Box<[Block]>,
}

impl Default for Voxels {
    fn default() -> Self {
        Self::new()
    }
}

impl Voxels {
    pub fn new() -> Self {
        Voxels {
            blocks: vec![Block::AIR; CHUNK_VOLUME].into_boxed_slice(),
        }
    }

    /// Every cell set to `ty` with no light.
    pub fn filled(ty: BlockType) -> Self {
        Voxels {
            blocks: vec![Block::new(ty, 0); CHUNK_VOLUME].into_boxed_slice(),
        }
    }

    pub fn in_bounds(pos: IVec3) -> bool {
        pos.x >= 0
            && pos.x < CHUNK_SIZE
            && pos.y >= 0
            && pos.y < CHUNK_HEIGHT
            && pos.z >= 0
            && pos.z < CHUNK_SIZE
    }

    fn index(pos: IVec3) -> usize {
        (pos.x + CHUNK_SIZE * (pos.z + CHUNK_SIZE * pos.y)) as usize
    }

    /// Lenient lookup: `None` outside the chunk.
    pub fn get(&self, pos: IVec3) -> Option<Block> {
        Self::in_bounds(pos).then(|| self.blocks[Self::index(pos)])
    }

    pub fn get_mut(&mut self, pos: IVec3) -> Option<&mut Block> {
        if Self::in_bounds(pos) {
            Some(&mut self.blocks[Self::index(pos)])
        } else {
            None
        }
    }

    /// Strict lookup used by public accessors.
    pub fn block(&self, pos: IVec3) -> Result<Block, WorldError> {
        self.get(pos).ok_or(WorldError::OutOfBounds(pos))
    }

    pub fn block_type(&self, pos: IVec3) -> BlockType {
        self.get(pos).map(|b| b.ty).unwrap_or(BlockType::Air)
    }

    /// Writes outside the chunk are ignored.
    pub fn set_type(&mut self, pos: IVec3, ty: BlockType) {
        if let Some(block) = self.get_mut(pos) {
            block.ty = ty;
        }
    }

    pub fn set_light(&mut self, pos: IVec3, level: u8) {
        if let Some(block) = self.get_mut(pos) {
            block.set_light(level);
        }
    }

    /// Highest solid voxel in a column, if any.
    pub fn top_solid(&self, x: i32, z: i32) -> Option<i32> {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| self.block_type(IVec3::new(x, y, z)).is_solid())
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec3, Block)> + '_ {
        self.blocks.iter().enumerate().map(|(i, block)| {
            let i = i as i32;
            let x = i % CHUNK_SIZE;
            let z = (i / CHUNK_SIZE) % CHUNK_SIZE;
            let y = i / (CHUNK_SIZE * CHUNK_SIZE);
            (IVec3::new(x, y, z), *block)
        })
    }
}

pub struct Chunk {
    key: ColumnKey,
    voxels: RwLock<Voxels>,
    has_generated: AtomicBool,
    is_meshed: AtomicBool,
    is_disposed: AtomicBool,
    created_at: Instant,
    aabb: AABB,
}

impl Chunk {
    pub fn new(key: ColumnKey) -> Self {
        let origin = key.origin().as_vec3();
        Chunk {
            key,
            voxels: RwLock::new(Voxels::new()),
            has_generated: AtomicBool::new(false),
            is_meshed: AtomicBool::new(false),
            is_disposed: AtomicBool::new(false),
            created_at: Instant::now(),
            aabb: AABB::new(
                origin,
                origin + Vec3::new(CHUNK_SIZE as f32, CHUNK_HEIGHT as f32, CHUNK_SIZE as f32),
            ),
        }
    }

    pub fn key(&self) -> ColumnKey {
        self.key
    }

    pub fn origin(&self) -> IVec3 {
        self.key.origin()
    }

    pub fn aabb(&self) -> &AABB {
        &self.aabb
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn voxels(&self) -> RwLockReadGuard<'_, Voxels> {
        self.voxels.read()
    }

    /// Installs generated voxel data. Succeeds at most once per chunk.
    pub fn commit_generated(&self, voxels: Voxels) -> Result<(), GenerationError> {
        if self.is_disposed() {
            return Err(GenerationError::Disposed(self.key));
        }
        let mut guard = self.voxels.write();
        if self.has_generated.load(Ordering::Acquire) {
            return Err(GenerationError::AlreadyGenerated(self.key));
        }
        *guard = voxels;
        self.has_generated.store(true, Ordering::Release);
        Ok(())
    }

    pub fn has_generated(&self) -> bool {
        self.has_generated.load(Ordering::Acquire)
    }

    pub fn is_meshed(&self) -> bool {
        self.is_meshed.load(Ordering::Acquire)
    }

    pub fn set_meshed(&self, meshed: bool) {
        self.is_meshed.store(meshed, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.is_disposed.load(Ordering::Acquire)
    }

    /// Returns `true` only for the call that actually disposed the chunk.
    pub fn mark_disposed(&self) -> bool {
        !self.is_disposed.swap(true, Ordering::AcqRel)
    }

    /// Strict accessor: errors on coordinates outside the chunk.
    pub fn block(&self, local: IVec3) -> Result<Block, WorldError> {
        self.voxels.read().block(local)
    }

    /// Fade-in ramp from 0 to 1 over the first 300ms of the chunk's life.
    pub fn opacity(&self, now: Instant) -> f32 {
        let age = now.saturating_duration_since(self.created_at);
        let ramp = Duration::from_millis(FADE_IN_MILLIS);
        (age.as_secs_f32() / ramp.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// A resolved point lookup: the owning chunk plus the local coordinate.
#[derive(Clone)]
pub struct BlockRef {
    pub chunk: Arc<Chunk>,
    pub local: IVec3,
}

impl BlockRef {
    pub fn block(&self) -> Block {
        // local was validated when the ref was built
        self.chunk
            .voxels()
            .get(self.local)
            .unwrap_or(Block::AIR)
    }

    pub fn world_position(&self) -> IVec3 {
        self.chunk.origin() + self.local
    }
}
