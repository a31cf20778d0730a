//! Core data structures: voxels, chunks, the chunk-local cursor and vertices.

pub mod block;
pub mod chunk;
pub mod cursor;
pub mod vertex;

// Re-export commonly used types
pub use block::{Block, BlockType};
pub use chunk::{BlockRef, Chunk, ColumnKey, Side, Voxels};
pub use cursor::BlockCursor;
pub use vertex::Vertex;
