use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::core::chunk::Chunk;
use crate::error::MeshError;
use crate::render::mesh::{ChunkNeighbors, MeshBuffers, build_chunk};
use crate::render::upload::{ChunkMesh, RenderQueue};
use crate::world::context::{CancellationToken, MeshRequest, StreamContext};

/// Pool of mesh workers. Finished buffers go straight to the render queue.
pub struct MeshPool {
    workers: Vec<JoinHandle<()>>,
}

impl MeshPool {
    pub fn spawn(ctx: &StreamContext, worker_count: usize) -> std::io::Result<Self> {
        Self::spawn_with(ctx, worker_count, build_chunk)
    }

    /// Like `spawn`, but every worker meshes with its own clone of `build`.
    pub fn spawn_with<F>(ctx: &StreamContext, worker_count: usize, build: F) -> std::io::Result<Self>
    where
        F: Fn(&Chunk, &ChunkNeighbors) -> Result<MeshBuffers, MeshError> + Clone + Send + 'static,
    {
        let mut workers = Vec::with_capacity(worker_count);

        for i in 0..worker_count {
            let rx = ctx.mesh_rx.clone();
            let render = ctx.render.clone();
            let cancel = ctx.cancel.clone();
            let poll_interval = ctx.poll_interval;
            let build = build.clone();

            let handle = thread::Builder::new()
                .name(format!("mesh-worker-{}", i))
                .spawn(move || run_worker(&build, &rx, &render, &cancel, poll_interval))?;
            workers.push(handle);
        }

        tracing::info!("Started {} mesh workers", worker_count);
        Ok(Self { workers })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn join(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                tracing::error!("Mesh worker exited by panic");
            }
        }
    }
}

fn run_worker<F>(
    build: &F,
    rx: &Receiver<MeshRequest>,
    render: &RenderQueue,
    cancel: &CancellationToken,
    poll_interval: Duration,
) where
    F: Fn(&Chunk, &ChunkNeighbors) -> Result<MeshBuffers, MeshError>,
{
    while !cancel.is_cancelled() {
        match rx.recv_timeout(poll_interval) {
            Ok(request) => {
                if let Some(mesh) = mesh_one(build, request) {
                    render.upload(mesh);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn mesh_one<F>(build: &F, request: MeshRequest) -> Option<ChunkMesh>
where
    F: Fn(&Chunk, &ChunkNeighbors) -> Result<MeshBuffers, MeshError>,
{
    let key = request.chunk.key();
    if request.chunk.is_disposed() {
        return None;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| build(&request.chunk, &request.neighbors))) {
        Ok(Ok(buffers)) => {
            tracing::debug!(
                "Meshed chunk {:?}: {} opaque, {} transparent vertices",
                key,
                buffers.opaque.len(),
                buffers.transparent.len()
            );
            Some(ChunkMesh {
                chunk: request.chunk,
                opaque: buffers.opaque,
                transparent: buffers.transparent,
            })
        }
        Ok(Err(MeshError::Disposed(_))) => None,
        Ok(Err(e)) => {
            tracing::error!("Mesh task for chunk {:?} failed: {}", key, e);
            None
        }
        Err(_) => {
            tracing::error!("Mesh task for chunk {:?} panicked", key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerSettings;
    use crate::core::block::BlockType;
    use crate::core::chunk::{ColumnKey, Side, Voxels};
    use crate::render::upload::RenderCommand;
    use std::sync::Arc;

    fn generated(key: ColumnKey) -> Arc<Chunk> {
        let chunk = Arc::new(Chunk::new(key));
        let mut voxels = Voxels::new();
        voxels.set_type(glam::IVec3::new(8, 10, 8), BlockType::Stone);
        chunk.commit_generated(voxels).unwrap();
        chunk
    }

    fn request(center: ColumnKey) -> MeshRequest {
        MeshRequest {
            chunk: generated(center),
            neighbors: ChunkNeighbors {
                left: generated(center.neighbor(Side::Left)),
                right: generated(center.neighbor(Side::Right)),
                front: generated(center.neighbor(Side::Front)),
                back: generated(center.neighbor(Side::Back)),
            },
            distance_sq: 0.0,
        }
    }

    fn wait_for_upload(ctx: &StreamContext) -> ChunkMesh {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            if let Some(RenderCommand::Upload(mesh)) = ctx.render.drain().into_iter().next() {
                return mesh;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("no mesh uploaded before the deadline");
    }

    #[test]
    fn failed_precondition_is_dropped() {
        let mut req = request(ColumnKey::new(0, 0));
        req.neighbors.back = Arc::new(Chunk::new(ColumnKey::new(0, -1)));
        assert!(mesh_one(&build_chunk, req).is_none());
    }

    #[test]
    fn panicking_build_is_dropped() {
        let build = |_: &Chunk, _: &ChunkNeighbors| -> Result<MeshBuffers, MeshError> {
            panic!("broken mesher")
        };
        assert!(mesh_one(&build, request(ColumnKey::new(0, 0))).is_none());
    }

    #[test]
    fn worker_survives_panicking_build() {
        let ctx = StreamContext::new(&WorkerSettings {
            poll_interval_ms: 5,
            ..Default::default()
        });
        let broken = ColumnKey::new(0, 0);
        let pool = MeshPool::spawn_with(&ctx, 1, move |chunk: &Chunk, neighbors: &ChunkNeighbors| {
            if chunk.key() == broken {
                panic!("broken mesher");
            }
            build_chunk(chunk, neighbors)
        })
        .unwrap();

        let healthy = request(ColumnKey::new(5, 5));
        let chunk = Arc::clone(&healthy.chunk);
        ctx.mesh_tx.send(request(broken)).ok().unwrap();
        ctx.mesh_tx.send(healthy).ok().unwrap();

        let uploaded = wait_for_upload(&ctx);
        assert!(Arc::ptr_eq(&uploaded.chunk, &chunk));
        assert!(ctx.render.is_empty());

        ctx.cancel();
        pool.join();
    }

    #[test]
    fn pool_uploads_meshes() {
        let ctx = StreamContext::new(&WorkerSettings::default());
        let pool = MeshPool::spawn(&ctx, 1).unwrap();
        let req = request(ColumnKey::new(3, 3));
        let chunk = Arc::clone(&req.chunk);
        ctx.mesh_tx.send(req).ok().unwrap();

        let mesh = wait_for_upload(&ctx);
        assert!(Arc::ptr_eq(&mesh.chunk, &chunk));
        assert_eq!(mesh.opaque.len(), 36);

        ctx.cancel();
        pool.join();
    }
}
