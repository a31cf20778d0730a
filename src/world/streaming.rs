//! Streaming controller
//!
//! Owns the registry of loaded columns and decides what to load, unload,
//! generate and mesh as the viewpoint moves. Neighbors are found by key, never
//! stored. Each slot carries a readiness countdown:
//!
//! `outstanding = (self not generated) + #(sides whose neighbor is absent or not generated)`
//!
//! A mesh request is sent exactly once, when the countdown first reaches zero.
//! Only this thread touches the registry; workers see chunks through `Arc`s.

use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use glam::{IVec3, Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::config::StreamingSettings;
use crate::core::chunk::{BlockRef, Chunk, ColumnKey, Side, Voxels};
use crate::error::WorldError;
use crate::render::frustum::extract_frustum_planes;
use crate::render::mesh::ChunkNeighbors;
use crate::world::context::{GenerationRequest, MeshRequest, Prioritized, StreamContext};

struct Slot {
    chunk: Arc<Chunk>,
    /// Generation completion seen by the controller. Lags `Chunk::has_generated`
    /// until the completion is drained.
    generated: bool,
    outstanding: u8,
    mesh_dispatched: bool,
}

pub struct World {
    chunks: FxHashMap<ColumnKey, Slot>,
    current_chunk: Option<ColumnKey>,
    settings: StreamingSettings,
    ctx: StreamContext,
    generation_backlog: Vec<GenerationRequest>,
    mesh_backlog: Vec<MeshRequest>,
    viewpoint: Vec3,
}

impl World {
    pub fn new(settings: StreamingSettings, ctx: StreamContext) -> Self {
        World {
            chunks: FxHashMap::default(),
            current_chunk: None,
            settings,
            ctx,
            generation_backlog: Vec::new(),
            mesh_backlog: Vec::new(),
            viewpoint: Vec3::ZERO,
        }
    }

    /// Loads the square around the viewpoint's column and dispatches generation nearest-first.
    pub fn initialize(&mut self, viewpoint: Vec3) {
        let center = ColumnKey::containing(viewpoint);
        self.viewpoint = viewpoint;

        let loaded = self.load_square(center, viewpoint);
        self.current_chunk = Some(center);
        let sent = self.flush_generation();

        tracing::info!(
            "Initialized world around {:?}: {} chunks loaded, {} generation requests sent",
            center,
            loaded,
            sent
        );
    }

    /// Per-frame trigger: recenters once the viewpoint drifts far enough from
    /// the current column.
    pub fn update(&mut self, viewpoint: Vec3) {
        let Some(current) = self.current_chunk else {
            self.initialize(viewpoint);
            return;
        };

        let drift = current.center().distance(Vec2::new(viewpoint.x, viewpoint.z));
        if drift > self.settings.update_distance_threshold {
            self.update_current_chunk(viewpoint, ColumnKey::containing(viewpoint));
        }
    }

    pub fn update_current_chunk(&mut self, viewpoint: Vec3, new_current: ColumnKey) {
        if self.current_chunk == Some(new_current) {
            return;
        }
        self.viewpoint = viewpoint;

        let loaded = self.load_square(new_current, viewpoint);

        let radius_sq = self.unload_radius().powi(2);
        let far: Vec<ColumnKey> = self
            .chunks
            .keys()
            .copied()
            .filter(|key| key.distance_sq(viewpoint) > radius_sq)
            .collect();
        for key in &far {
            self.unload(*key);
        }

        self.current_chunk = Some(new_current);
        self.flush_generation();

        tracing::debug!(
            "Moved to {:?}: {} loaded, {} unloaded, {} resident",
            new_current,
            loaded,
            far.len(),
            self.chunks.len()
        );
    }

    /// Drains generation completions, advances countdowns and flushes both backlogs.
    /// Returns the number of completions processed.
    pub fn pump(&mut self, viewpoint: Vec3) -> usize {
        self.viewpoint = viewpoint;

        let completed: Vec<Arc<Chunk>> = self.ctx.generated_rx.try_iter().collect();
        let count = completed.len();
        for chunk in completed {
            self.on_generated(chunk);
        }

        self.flush_mesh();
        self.flush_generation();
        count
    }

    /// Unloads everything and starts over around `viewpoint`.
    pub fn reset(&mut self, viewpoint: Vec3) {
        let dropped = self.ctx.clear_pending();
        self.generation_backlog.clear();
        self.mesh_backlog.clear();

        let unloaded = self.chunks.len();
        for (_, slot) in self.chunks.drain() {
            slot.chunk.mark_disposed();
            self.ctx.render.dispose(slot.chunk);
        }
        // completions for chunks that no longer exist
        self.ctx.generated_rx.try_iter().for_each(drop);
        self.current_chunk = None;

        tracing::info!(
            "Reset world: {} chunks unloaded, {} queued requests dropped",
            unloaded,
            dropped
        );
        self.initialize(viewpoint);
    }

    /// Re-dispatches work for every loaded chunk without discarding voxel data:
    /// meshes for generated chunks, generation for the rest.
    pub fn reload(&mut self) {
        self.ctx.clear_pending();
        self.generation_backlog.clear();
        self.mesh_backlog.clear();

        let viewpoint = self.viewpoint;
        let mut ready = Vec::new();
        for (key, slot) in self.chunks.iter_mut() {
            if slot.generated {
                slot.mesh_dispatched = false;
                if slot.outstanding == 0 {
                    ready.push(*key);
                }
            } else {
                self.generation_backlog.push(GenerationRequest {
                    chunk: Arc::clone(&slot.chunk),
                    distance_sq: key.distance_sq(viewpoint),
                });
            }
        }
        for key in ready {
            self.dispatch_mesh(key);
        }

        let meshes = self.flush_mesh();
        let generation = self.flush_generation();
        tracing::info!(
            "Reloaded world: {} mesh and {} generation requests sent",
            meshes,
            generation
        );
    }

    pub fn set_render_distance(&mut self, render_distance: i32, viewpoint: Vec3) {
        self.settings.render_distance = render_distance.max(1);
        tracing::info!("Render distance set to {}", self.settings.render_distance);
        self.reset(viewpoint);
    }

    /// Registers a new column and queues its generation. Returns `false` if it
    /// was already loaded.
    pub fn load(&mut self, key: ColumnKey, viewpoint: Vec3) -> bool {
        if self.chunks.contains_key(&key) {
            return false;
        }

        let chunk = Arc::new(Chunk::new(key));
        let waiting_sides = Side::ALL
            .iter()
            .filter(|side| {
                !self
                    .chunks
                    .get(&key.neighbor(**side))
                    .is_some_and(|slot| slot.generated)
            })
            .count() as u8;

        self.generation_backlog.push(GenerationRequest {
            chunk: Arc::clone(&chunk),
            distance_sq: key.distance_sq(viewpoint),
        });
        self.chunks.insert(
            key,
            Slot {
                chunk,
                generated: false,
                outstanding: 1 + waiting_sides,
                mesh_dispatched: false,
            },
        );
        true
    }

    /// Removes a column and hands it to the renderer for disposal.
    pub fn unload(&mut self, key: ColumnKey) -> bool {
        let Some(slot) = self.chunks.remove(&key) else {
            return false;
        };

        if slot.generated {
            for side in Side::ALL {
                if let Some(neighbor) = self.chunks.get_mut(&key.neighbor(side)) {
                    neighbor.outstanding += 1;
                }
            }
        }

        slot.chunk.mark_disposed();
        self.ctx.render.dispose(slot.chunk);
        true
    }

    fn load_square(&mut self, center: ColumnKey, viewpoint: Vec3) -> usize {
        let radius = self.settings.render_distance;
        let mut loaded = 0;
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if self.load(ColumnKey::new(center.x + dx, center.z + dz), viewpoint) {
                    loaded += 1;
                }
            }
        }
        loaded
    }

    fn on_generated(&mut self, chunk: Arc<Chunk>) {
        let key = chunk.key();
        let Some(slot) = self.chunks.get_mut(&key) else {
            return;
        };
        // stale completion from an unloaded instance of the same column
        if !Arc::ptr_eq(&slot.chunk, &chunk) || slot.generated {
            return;
        }

        slot.generated = true;
        slot.outstanding = slot.outstanding.saturating_sub(1);
        let mut ready = Vec::new();
        if slot.outstanding == 0 {
            ready.push(key);
        }

        for side in Side::ALL {
            let neighbor_key = key.neighbor(side);
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_key) {
                neighbor.outstanding = neighbor.outstanding.saturating_sub(1);
                if neighbor.outstanding == 0 {
                    ready.push(neighbor_key);
                }
            }
        }

        for key in ready {
            self.dispatch_mesh(key);
        }
    }

    fn dispatch_mesh(&mut self, key: ColumnKey) {
        let Some(neighbors) = self.ready_neighbors(key) else {
            return;
        };
        let Some(slot) = self.chunks.get_mut(&key) else {
            return;
        };
        if slot.outstanding != 0 || slot.mesh_dispatched {
            return;
        }

        slot.mesh_dispatched = true;
        self.mesh_backlog.push(MeshRequest {
            chunk: Arc::clone(&slot.chunk),
            neighbors,
            distance_sq: key.distance_sq(self.viewpoint),
        });
    }

    fn ready_neighbors(&self, key: ColumnKey) -> Option<ChunkNeighbors> {
        let neighbor = |side: Side| {
            self.chunks
                .get(&key.neighbor(side))
                .filter(|slot| slot.generated)
                .map(|slot| Arc::clone(&slot.chunk))
        };
        Some(ChunkNeighbors {
            left: neighbor(Side::Left)?,
            right: neighbor(Side::Right)?,
            front: neighbor(Side::Front)?,
            back: neighbor(Side::Back)?,
        })
    }

    fn flush_generation(&mut self) -> usize {
        flush_backlog(
            &mut self.generation_backlog,
            &self.ctx.generation_tx,
            self.viewpoint,
        )
    }

    fn flush_mesh(&mut self) -> usize {
        flush_backlog(&mut self.mesh_backlog, &self.ctx.mesh_tx, self.viewpoint)
    }

    /// Resolves a world-space voxel position to its owning chunk.
    pub fn block_at(&self, position: IVec3) -> Result<BlockRef, WorldError> {
        let key = ColumnKey::containing_block(position);
        let slot = self
            .chunks
            .get(&key)
            .ok_or(WorldError::NotLoaded(position))?;

        let local = position - key.origin();
        if !Voxels::in_bounds(local) {
            return Err(WorldError::OutOfBounds(local));
        }
        Ok(BlockRef {
            chunk: Arc::clone(&slot.chunk),
            local,
        })
    }

    /// Loaded chunk whose column center is closest to `position` (horizontal).
    pub fn nearest_chunk(&self, position: Vec2) -> Option<Arc<Chunk>> {
        self.chunks
            .iter()
            .min_by(|(a, _), (b, _)| {
                a.center()
                    .distance_squared(position)
                    .total_cmp(&b.center().distance_squared(position))
            })
            .map(|(_, slot)| Arc::clone(&slot.chunk))
    }

    /// Snapshot of loaded chunks, nearest first.
    pub fn chunks_by_distance(&self, viewpoint: Vec3) -> Vec<Arc<Chunk>> {
        let mut chunks: Vec<(f32, Arc<Chunk>)> = self
            .chunks
            .iter()
            .map(|(key, slot)| (key.distance_sq(viewpoint), Arc::clone(&slot.chunk)))
            .collect();
        chunks.sort_by(|a, b| a.0.total_cmp(&b.0));
        chunks.into_iter().map(|(_, chunk)| chunk).collect()
    }

    /// Snapshot of loaded chunks, farthest first (back-to-front blending).
    pub fn chunks_by_distance_desc(&self, viewpoint: Vec3) -> Vec<Arc<Chunk>> {
        let mut chunks = self.chunks_by_distance(viewpoint);
        chunks.reverse();
        chunks
    }

    /// Chunks whose bounds intersect the view frustum, farthest first.
    pub fn visible_chunks(&self, view_proj: &Mat4, viewpoint: Vec3) -> Vec<Arc<Chunk>> {
        let planes = extract_frustum_planes(view_proj);
        self.chunks_by_distance_desc(viewpoint)
            .into_iter()
            .filter(|chunk| chunk.aabb().is_visible(&planes))
            .collect()
    }

    pub fn unload_radius(&self) -> f32 {
        self.settings.unload_radius()
    }

    pub fn render_distance(&self) -> i32 {
        self.settings.render_distance
    }

    pub fn current_chunk(&self) -> Option<ColumnKey> {
        self.current_chunk
    }

    pub fn get(&self, key: ColumnKey) -> Option<&Arc<Chunk>> {
        self.chunks.get(&key).map(|slot| &slot.chunk)
    }

    pub fn contains(&self, key: ColumnKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.chunks.keys().copied()
    }

    /// Outstanding readiness events of a loaded column.
    pub fn readiness(&self, key: ColumnKey) -> Option<u8> {
        self.chunks.get(&key).map(|slot| slot.outstanding)
    }

    pub fn backlog(&self) -> (usize, usize) {
        (self.generation_backlog.len(), self.mesh_backlog.len())
    }

    /// Recomputes every countdown from scratch and compares it to the stored value.
    pub fn countdowns_consistent(&self) -> bool {
        self.chunks.iter().all(|(key, slot)| {
            let waiting = Side::ALL
                .iter()
                .filter(|side| {
                    !self
                        .chunks
                        .get(&key.neighbor(**side))
                        .is_some_and(|n| n.generated)
                })
                .count() as u8;
            slot.outstanding == waiting + u8::from(!slot.generated)
        })
    }
}

/// Re-sorts a backlog by current distance and pushes as much as the bounded
/// channel accepts. The remainder waits for the next flush.
fn flush_backlog<R: Prioritized>(backlog: &mut Vec<R>, tx: &Sender<R>, viewpoint: Vec3) -> usize {
    let mut pending = std::mem::take(backlog);
    pending.retain(|request| !request.chunk().is_disposed());
    for request in pending.iter_mut() {
        let distance_sq = request.chunk().key().distance_sq(viewpoint);
        request.set_distance_sq(distance_sq);
    }
    pending.sort_by(|a, b| a.distance_sq().total_cmp(&b.distance_sq()));

    let mut sent = 0;
    let mut requests = pending.into_iter();
    while let Some(request) = requests.next() {
        match tx.try_send(request) {
            Ok(()) => sent += 1,
            Err(TrySendError::Full(request)) => {
                backlog.push(request);
                backlog.extend(requests);
                tracing::debug!("Request queue full, {} requests deferred", backlog.len());
                break;
            }
            Err(TrySendError::Disconnected(request)) => {
                backlog.push(request);
                backlog.extend(requests);
                tracing::warn!("Request queue disconnected, {} requests kept", backlog.len());
                break;
            }
        }
    }
    sent
}
