// Core module with fundamental types
pub mod core;

// Render module: meshing, atlas addressing, culling and the upload queue
pub mod render;

// World module with generation and streaming
pub mod world;

// Other modules
pub mod config;
pub mod constants;
pub mod error;

// Re-exports
pub use config::{StreamingSettings, WorkerSettings, WorldSettings};
pub use constants::*;
pub use crate::core::{Block, BlockCursor, BlockRef, BlockType, Chunk, ColumnKey, Side, Vertex, Voxels};
pub use error::{GenerationError, MeshError, SettingsError, WorldError};
pub use render::{
    AABB, ChunkMesh, MeshBuffers, MeshPool, RenderCommand, RenderQueue, ResidentMeshes,
    extract_frustum_planes,
};
pub use world::{CancellationToken, GenerationPool, StreamContext, TerrainGenerator, World};
