//! Rendering-side modules
//! Contains mesh building, atlas addressing, frustum culling, mesh workers and the upload queue.

pub mod atlas;
pub mod frustum;
pub mod mesh;
pub mod mesh_loader;
pub mod upload;

// Re-export commonly used types
pub use atlas::{FaceType, tile_for, tile_uv};
pub use frustum::{AABB, extract_frustum_planes};
pub use mesh::{ChunkNeighbors, MeshBuffers, NeighborVoxels, build, build_chunk};
pub use mesh_loader::MeshPool;
pub use upload::{ChunkMesh, RenderCommand, RenderQueue, ResidentMeshes};
