//! Single-consumer hand-off between the pipeline and the renderer thread.
//!
//! Mesh workers push uploads and the controller pushes disposals; the renderer
//! drains the queue once per frame and is the only place buffers are created
//! or freed.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashMap;

use crate::core::chunk::{Chunk, ColumnKey};
use crate::core::vertex::Vertex;

pub struct ChunkMesh {
    pub chunk: Arc<Chunk>,
    pub opaque: Vec<Vertex>,
    pub transparent: Vec<Vertex>,
}

impl ChunkMesh {
    pub fn key(&self) -> ColumnKey {
        self.chunk.key()
    }
}

pub enum RenderCommand {
    Upload(ChunkMesh),
    Dispose(Arc<Chunk>),
}

#[derive(Clone)]
pub struct RenderQueue {
    tx: Sender<RenderCommand>,
    rx: Receiver<RenderCommand>,
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn upload(&self, mesh: ChunkMesh) {
        // infallible: the queue holds its own receiver
        self.tx.send(RenderCommand::Upload(mesh)).ok();
    }

    pub fn dispose(&self, chunk: Arc<Chunk>) {
        self.tx.send(RenderCommand::Dispose(chunk)).ok();
    }

    /// Everything queued so far, in submission order.
    pub fn drain(&self) -> Vec<RenderCommand> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Renderer-side view of resident chunk meshes.
#[derive(Default)]
pub struct ResidentMeshes {
    meshes: FxHashMap<ColumnKey, ChunkMesh>,
    uploads: usize,
    disposals: usize,
}

impl ResidentMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one frame's worth of commands. Uploads for chunks that were
    /// disposed in the meantime are dropped.
    pub fn apply(&mut self, commands: Vec<RenderCommand>) {
        for command in commands {
            match command {
                RenderCommand::Upload(mesh) => {
                    if mesh.chunk.is_disposed() {
                        continue;
                    }
                    mesh.chunk.set_meshed(true);
                    self.uploads += 1;
                    self.meshes.insert(mesh.key(), mesh);
                }
                RenderCommand::Dispose(chunk) => {
                    let key = chunk.key();
                    // a newer chunk may already occupy the same column
                    if self
                        .meshes
                        .get(&key)
                        .is_some_and(|mesh| Arc::ptr_eq(&mesh.chunk, &chunk))
                    {
                        self.meshes.remove(&key);
                    }
                    chunk.set_meshed(false);
                    self.disposals += 1;
                }
            }
        }
    }

    pub fn get(&self, key: ColumnKey) -> Option<&ChunkMesh> {
        self.meshes.get(&key)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn disposals(&self) -> usize {
        self.disposals
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .values()
            .map(|m| m.opaque.len() + m.transparent.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_for(chunk: &Arc<Chunk>) -> ChunkMesh {
        ChunkMesh {
            chunk: Arc::clone(chunk),
            opaque: vec![Vertex::default(); 6],
            transparent: Vec::new(),
        }
    }

    #[test]
    fn drain_preserves_order() {
        let queue = RenderQueue::new();
        let a = Arc::new(Chunk::new(ColumnKey::new(0, 0)));
        let b = Arc::new(Chunk::new(ColumnKey::new(1, 0)));
        queue.upload(mesh_for(&a));
        queue.dispose(Arc::clone(&b));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert!(matches!(drained[0], RenderCommand::Upload(_)));
        assert!(matches!(drained[1], RenderCommand::Dispose(_)));
        assert!(queue.is_empty());
    }

    #[test]
    fn upload_after_dispose_is_ignored() {
        let chunk = Arc::new(Chunk::new(ColumnKey::new(2, 2)));
        chunk.mark_disposed();
        let mut resident = ResidentMeshes::new();
        resident.apply(vec![RenderCommand::Upload(mesh_for(&chunk))]);
        assert!(resident.is_empty());
        assert!(!chunk.is_meshed());
    }

    #[test]
    fn stale_dispose_keeps_newer_mesh() {
        let key = ColumnKey::new(5, -1);
        let old = Arc::new(Chunk::new(key));
        let new = Arc::new(Chunk::new(key));
        old.mark_disposed();

        let mut resident = ResidentMeshes::new();
        resident.apply(vec![
            RenderCommand::Upload(mesh_for(&new)),
            RenderCommand::Dispose(old),
        ]);
        assert!(resident.get(key).is_some());
        assert!(new.is_meshed());
        assert_eq!(resident.vertex_count(), 6);
    }
}
