// Chunk dimensions
pub const CHUNK_SIZE: i32 = 16;
pub const CHUNK_HEIGHT: i32 = 384;
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_HEIGHT * CHUNK_SIZE) as usize;

// Terrain
pub const SEA_LEVEL: i32 = 64;
pub const DIRT_BAND: i32 = 3;
pub const CAVERN_DEPTH: i32 = 48;
pub const MAX_LIGHT: u8 = 15;

// Streaming
pub const RENDER_DISTANCE: i32 = 11;
/// Extra chunk-widths beyond the load square before a column is dropped.
pub const UNLOAD_MARGIN: i32 = 3;
/// How far (world units) the viewpoint may drift from the current chunk center
/// before the desired set is recomputed.
pub const UPDATE_DISTANCE_THRESHOLD: f32 = 24.0;
pub const FADE_IN_MILLIS: u64 = 300;

// Workers
pub const POLL_INTERVAL_MILLIS: u64 = 25;
pub const GENERATION_QUEUE_CAPACITY: usize = 64;
pub const MESH_QUEUE_CAPACITY: usize = 64;

// Texture atlas: 16x16 grid of tiles
pub const ATLAS_TILES: u32 = 16;

// Indexes of textures in the atlas that don't match a block id
pub const TEX_GRASS_TOP: u32 = 1;
pub const TEX_DIRT: u32 = 2;
pub const TEX_GRASS_SIDE: u32 = 3;
pub const TEX_LOG_SIDE: u32 = 8;
pub const TEX_LOG_TOP: u32 = 9;

// Vertex layout: position(3) normal(3) barycentric(3) uv(2) light(1)
pub const VERTEX_STRIDE: usize = 12;
pub const VERTICES_PER_FACE: usize = 6;
