//! Background chunk generation
//!
//! A fixed pool of named threads, each with its own `TerrainGenerator`, pulls
//! requests from the bounded generation channel and reports finished chunks on
//! the completion channel. Workers poll with a timeout so they notice
//! cancellation even when the queue is idle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::core::chunk::Chunk;
use crate::error::GenerationError;
use crate::world::context::{CancellationToken, GenerationRequest, StreamContext};
use crate::world::generator::TerrainGenerator;

pub struct GenerationPool {
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    pub fn spawn(
        ctx: &StreamContext,
        generator: TerrainGenerator,
        num_workers: usize,
    ) -> std::io::Result<Self> {
        Self::spawn_with(ctx, num_workers, move |chunk: &Chunk| {
            generator.generate(chunk)
        })
    }

    /// Spawns workers that run `task` for every accepted request. Each worker
    /// gets its own clone of the task.
    pub fn spawn_with<F>(ctx: &StreamContext, num_workers: usize, task: F) -> std::io::Result<Self>
    where
        F: Fn(&Chunk) -> Result<(), GenerationError> + Clone + Send + 'static,
    {
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let rx = ctx.generation_rx.clone();
            let tx = ctx.generated_tx.clone();
            let cancel = ctx.cancel.clone();
            let poll_interval = ctx.poll_interval;
            let task = task.clone();

            let handle = thread::Builder::new()
                .name(format!("chunk-gen-{}", worker_id))
                .spawn(move || {
                    run_worker(&task, &rx, &tx, &cancel, poll_interval);
                })?;
            workers.push(handle);
        }

        tracing::info!("Started {} generation workers", num_workers);
        Ok(Self { workers })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to observe cancellation and exit.
    pub fn join(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                tracing::error!("Generation worker exited by panic");
            }
        }
    }
}

fn run_worker<F>(
    task: &F,
    rx: &Receiver<GenerationRequest>,
    tx: &Sender<Arc<Chunk>>,
    cancel: &CancellationToken,
    poll_interval: std::time::Duration,
) where
    F: Fn(&Chunk) -> Result<(), GenerationError>,
{
    while !cancel.is_cancelled() {
        match rx.recv_timeout(poll_interval) {
            Ok(request) => {
                if let Some(chunk) = generate_one(task, request) {
                    if tx.send(chunk).is_err() {
                        // Controller is gone
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Runs one generation task inside its own failure boundary.
/// Returns the chunk only if this call committed its voxels.
fn generate_one<F>(task: &F, request: GenerationRequest) -> Option<Arc<Chunk>>
where
    F: Fn(&Chunk) -> Result<(), GenerationError>,
{
    let chunk = request.chunk;
    let key = chunk.key();
    if chunk.is_disposed() || chunk.has_generated() {
        return None;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| task(&chunk))) {
        Ok(Ok(())) => {
            tracing::debug!("Generated chunk {:?}", key);
            Some(chunk)
        }
        Ok(Err(e @ (GenerationError::AlreadyGenerated(_) | GenerationError::Disposed(_)))) => {
            tracing::debug!("Skipped generation: {}", e);
            None
        }
        Err(_) => {
            tracing::error!("Generation task for chunk {:?} panicked", key);
            None
        }
    }
}
