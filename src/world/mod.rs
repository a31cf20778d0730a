//! World generation and streaming modules
//! Contains terrain generation, the generation workers and the streaming controller.

pub mod context;
pub mod generator;
pub mod loader;
pub mod streaming;

// Re-export commonly used types
pub use context::{CancellationToken, GenerationRequest, MeshRequest, StreamContext};
pub use generator::TerrainGenerator;
pub use loader::GenerationPool;
pub use streaming::World;
