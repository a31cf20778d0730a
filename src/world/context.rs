//! Channel handles and the cancellation flag shared by the controller and
//! both worker pools. Built once, cloned into each participant.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::config::WorkerSettings;
use crate::core::chunk::Chunk;
use crate::render::mesh::ChunkNeighbors;
use crate::render::upload::RenderQueue;

#[derive(Clone, Default, Debug)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Request for chunk generation. Distance is only used for dispatch order.
pub struct GenerationRequest {
    pub chunk: Arc<Chunk>,
    pub distance_sq: f32,
}

/// Request to mesh a chunk whose own data and all 4 neighbors are generated
pub struct MeshRequest {
    pub chunk: Arc<Chunk>,
    pub neighbors: ChunkNeighbors,
    pub distance_sq: f32,
}

/// Requests the controller keeps in a distance-sorted backlog.
pub trait Prioritized {
    fn chunk(&self) -> &Arc<Chunk>;
    fn distance_sq(&self) -> f32;
    fn set_distance_sq(&mut self, distance_sq: f32);
}

impl Prioritized for GenerationRequest {
    fn chunk(&self) -> &Arc<Chunk> {
        &self.chunk
    }

    fn distance_sq(&self) -> f32 {
        self.distance_sq
    }

    fn set_distance_sq(&mut self, distance_sq: f32) {
        self.distance_sq = distance_sq;
    }
}

impl Prioritized for MeshRequest {
    fn chunk(&self) -> &Arc<Chunk> {
        &self.chunk
    }

    fn distance_sq(&self) -> f32 {
        self.distance_sq
    }

    fn set_distance_sq(&mut self, distance_sq: f32) {
        self.distance_sq = distance_sq;
    }
}

#[derive(Clone)]
pub struct StreamContext {
    pub generation_tx: Sender<GenerationRequest>,
    pub generation_rx: Receiver<GenerationRequest>,
    /// Generation completions, drained by the controller.
    pub generated_tx: Sender<Arc<Chunk>>,
    pub generated_rx: Receiver<Arc<Chunk>>,
    pub mesh_tx: Sender<MeshRequest>,
    pub mesh_rx: Receiver<MeshRequest>,
    pub render: RenderQueue,
    pub cancel: CancellationToken,
    pub poll_interval: Duration,
}

impl StreamContext {
    pub fn new(settings: &WorkerSettings) -> Self {
        // Bounded request queues give backpressure; completions never block workers
        let (generation_tx, generation_rx) = bounded(settings.generation_queue_capacity);
        let (mesh_tx, mesh_rx) = bounded(settings.mesh_queue_capacity);
        let (generated_tx, generated_rx) = unbounded();

        Self {
            generation_tx,
            generation_rx,
            generated_tx,
            generated_rx,
            mesh_tx,
            mesh_rx,
            render: RenderQueue::new(),
            cancel: CancellationToken::new(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }

    /// Drops requests no worker has picked up yet. Work already running finishes.
    pub fn clear_pending(&self) -> usize {
        let generation = self.generation_rx.try_iter().count();
        let mesh = self.mesh_rx.try_iter().count();
        generation + mesh
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
