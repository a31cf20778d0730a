//! Naive per-face chunk meshing.
//!
//! Every non-air voxel emits one quad (two triangles, six vertices) per face
//! that opens onto a non-solid cell. Faces on the chunk's X/Z edges look into
//! the matching neighbor chunk; faces past the bottom or top of the world are
//! culled.

use std::sync::Arc;

use glam::IVec3;

use crate::constants::*;
use crate::core::block::{Block, BlockType};
use crate::core::chunk::{Chunk, Side, Voxels};
use crate::core::vertex::Vertex;
use crate::error::MeshError;
use crate::render::atlas::{FaceType, tile_for, tile_uv};

const BARYCENTRIC: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Output of a mesh build, split by render pass.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    pub opaque: Vec<Vertex>,
    pub transparent: Vec<Vertex>,
}

impl MeshBuffers {
    pub fn face_count(&self) -> usize {
        (self.opaque.len() + self.transparent.len()) / VERTICES_PER_FACE
    }
}

/// The four loaded, generated chunks bordering the chunk being meshed.
#[derive(Clone)]
pub struct ChunkNeighbors {
    pub left: Arc<Chunk>,
    pub right: Arc<Chunk>,
    pub front: Arc<Chunk>,
    pub back: Arc<Chunk>,
}

impl ChunkNeighbors {
    pub fn get(&self, side: Side) -> &Arc<Chunk> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}

/// Borrowed neighbor voxel arrays. A missing side reads as open air.
#[derive(Clone, Copy, Default)]
pub struct NeighborVoxels<'a> {
    pub left: Option<&'a Voxels>,
    pub right: Option<&'a Voxels>,
    pub front: Option<&'a Voxels>,
    pub back: Option<&'a Voxels>,
}

/// Builds the mesh of a generated chunk. Neither the chunk nor its neighbors
/// are mutated.
pub fn build_chunk(chunk: &Chunk, neighbors: &ChunkNeighbors) -> Result<MeshBuffers, MeshError> {
    if chunk.is_disposed() {
        return Err(MeshError::Disposed(chunk.key()));
    }
    if !chunk.has_generated() {
        return Err(MeshError::NotGenerated(chunk.key()));
    }
    for side in Side::ALL {
        let neighbor = neighbors.get(side);
        if !neighbor.has_generated() {
            return Err(MeshError::NeighborNotGenerated {
                chunk: chunk.key(),
                neighbor: neighbor.key(),
            });
        }
    }

    let voxels = chunk.voxels();
    let left = neighbors.left.voxels();
    let right = neighbors.right.voxels();
    let front = neighbors.front.voxels();
    let back = neighbors.back.voxels();

    Ok(build(
        &voxels,
        chunk.origin(),
        NeighborVoxels {
            left: Some(&left),
            right: Some(&right),
            front: Some(&front),
            back: Some(&back),
        },
    ))
}

/// Meshes a voxel array positioned at `origin` in world space.
pub fn build(voxels: &Voxels, origin: IVec3, neighbors: NeighborVoxels<'_>) -> MeshBuffers {
    let mut mesh = MeshBuffers::default();
    let open_air = Block::new(BlockType::Air, MAX_LIGHT);

    // Cross-boundary lookup with the local coordinate wrapped into the neighbor.
    // `None` means the face is culled.
    let adjacent = |pos: IVec3| -> Option<Block> {
        if pos.y < 0 || pos.y >= CHUNK_HEIGHT {
            return None;
        }
        let (side, wrapped) = if pos.x < 0 {
            (Side::Left, IVec3::new(pos.x + CHUNK_SIZE, pos.y, pos.z))
        } else if pos.x >= CHUNK_SIZE {
            (Side::Right, IVec3::new(pos.x - CHUNK_SIZE, pos.y, pos.z))
        } else if pos.z < 0 {
            (Side::Back, IVec3::new(pos.x, pos.y, pos.z + CHUNK_SIZE))
        } else if pos.z >= CHUNK_SIZE {
            (Side::Front, IVec3::new(pos.x, pos.y, pos.z - CHUNK_SIZE))
        } else {
            return voxels.get(pos);
        };

        let neighbor = match side {
            Side::Left => neighbors.left,
            Side::Right => neighbors.right,
            Side::Front => neighbors.front,
            Side::Back => neighbors.back,
        };
        match neighbor {
            Some(neighbor) => neighbor.get(wrapped),
            None => Some(open_air),
        }
    };

    for (local, block) in voxels.iter() {
        if block.is_air() {
            continue;
        }

        let target = if block.ty.is_plant() {
            &mut mesh.transparent
        } else {
            &mut mesh.opaque
        };

        for face in FACES {
            let Some(outward) = adjacent(local + face.offset) else {
                continue;
            };
            if outward.is_solid() {
                continue;
            }
            add_face(
                target,
                &face,
                (origin + local).as_vec3().to_array(),
                tile_for(block.ty, face.face_type),
                outward.light() as f32,
            );
        }
    }

    mesh
}

struct Face {
    offset: IVec3,
    normal: [f32; 3],
    face_type: FaceType,
    /// BL, BR, TR, TL relative to the voxel's min corner.
    corners: [[f32; 3]; 4],
}

const FACES: [Face; 6] = [
    Face {
        offset: IVec3::NEG_X,
        normal: [-1.0, 0.0, 0.0],
        face_type: FaceType::Side,
        corners: [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
        ],
    },
    Face {
        offset: IVec3::X,
        normal: [1.0, 0.0, 0.0],
        face_type: FaceType::Side,
        corners: [
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
        ],
    },
    Face {
        offset: IVec3::NEG_Y,
        normal: [0.0, -1.0, 0.0],
        face_type: FaceType::Bottom,
        corners: [
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
        ],
    },
    Face {
        offset: IVec3::Y,
        normal: [0.0, 1.0, 0.0],
        face_type: FaceType::Top,
        corners: [
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
        ],
    },
    Face {
        offset: IVec3::NEG_Z,
        normal: [0.0, 0.0, -1.0],
        face_type: FaceType::Side,
        corners: [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ],
    },
    Face {
        offset: IVec3::Z,
        normal: [0.0, 0.0, 1.0],
        face_type: FaceType::Side,
        corners: [
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ],
    },
];

fn add_face(vertices: &mut Vec<Vertex>, face: &Face, base: [f32; 3], tile: u32, light: f32) {
    let (uv_min, uv_max) = tile_uv(tile);
    let uvs = [
        [uv_min.x, uv_min.y],
        [uv_max.x, uv_min.y],
        [uv_max.x, uv_max.y],
        [uv_min.x, uv_max.y],
    ];

    // BL-BR-TR, BL-TR-TL
    for (slot, corner) in [0usize, 1, 2, 0, 2, 3].into_iter().enumerate() {
        let offset = face.corners[corner];
        vertices.push(Vertex {
            position: [
                base[0] + offset[0],
                base[1] + offset[1],
                base[2] + offset[2],
            ],
            normal: face.normal,
            barycentric: BARYCENTRIC[slot % 3],
            uv: uvs[corner],
            light,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::ColumnKey;

    fn single_block(ty: BlockType, pos: IVec3) -> Voxels {
        let mut voxels = Voxels::new();
        voxels.set_type(pos, ty);
        voxels
    }

    #[test]
    fn lone_block_emits_six_faces() {
        let voxels = single_block(BlockType::Stone, IVec3::new(4, 100, 4));
        let mesh = build(&voxels, IVec3::ZERO, NeighborVoxels::default());
        assert_eq!(mesh.opaque.len(), 36);
        assert!(mesh.transparent.is_empty());
        assert_eq!(mesh.face_count(), 6);
    }

    #[test]
    fn buried_chunk_emits_nothing() {
        let stone = Voxels::filled(BlockType::Stone);
        let neighbors = NeighborVoxels {
            left: Some(&stone),
            right: Some(&stone),
            front: Some(&stone),
            back: Some(&stone),
        };
        let mesh = build(&stone, IVec3::ZERO, neighbors);
        assert!(mesh.opaque.is_empty());
        assert!(mesh.transparent.is_empty());
    }

    #[test]
    fn plants_go_to_transparent_buffer() {
        let mut voxels = single_block(BlockType::Flower2, IVec3::new(1, 50, 1));
        voxels.set_type(IVec3::new(1, 49, 1), BlockType::Grass);
        let mesh = build(&voxels, IVec3::ZERO, NeighborVoxels::default());
        // the flower's bottom face rests on grass
        assert_eq!(mesh.transparent.len(), 30);
        // a flower does not hide the grass top
        assert_eq!(mesh.opaque.len(), 36);
    }

    #[test]
    fn boundary_faces_are_culled_against_solid_neighbor() {
        let voxels = single_block(BlockType::Stone, IVec3::new(15, 10, 7));
        let mut right = Voxels::new();
        right.set_type(IVec3::new(0, 10, 7), BlockType::Dirt);

        let mesh = build(
            &voxels,
            IVec3::ZERO,
            NeighborVoxels {
                right: Some(&right),
                ..Default::default()
            },
        );
        assert_eq!(mesh.face_count(), 5);
        assert!(mesh.opaque.iter().all(|v| v.normal != [1.0, 0.0, 0.0]));
    }

    #[test]
    fn light_comes_from_outward_voxel() {
        let mut voxels = single_block(BlockType::Stone, IVec3::new(8, 20, 8));
        voxels.set_light(IVec3::new(8, 21, 8), 12);
        voxels.set_light(IVec3::new(8, 20, 8), 3);
        let mesh = build(&voxels, IVec3::ZERO, NeighborVoxels::default());

        let top: Vec<_> = mesh
            .opaque
            .iter()
            .filter(|v| v.normal == [0.0, 1.0, 0.0])
            .collect();
        assert_eq!(top.len(), 6);
        assert!(top.iter().all(|v| v.light == 12.0));
    }

    #[test]
    fn vertices_are_in_world_space() {
        let voxels = single_block(BlockType::Sand, IVec3::new(0, 0, 0));
        let origin = ColumnKey::new(-2, 3).origin();
        let mesh = build(&voxels, origin, NeighborVoxels::default());
        // bottom face at y=0 is culled
        assert_eq!(mesh.face_count(), 5);
        for v in &mesh.opaque {
            assert!(v.position[0] >= -32.0 && v.position[0] <= -31.0);
            assert!(v.position[2] >= 48.0 && v.position[2] <= 49.0);
        }
    }

    #[test]
    fn triangles_carry_barycentrics_and_atlas_uvs() {
        let voxels = single_block(BlockType::Grass, IVec3::new(3, 3, 3));
        let mesh = build(&voxels, IVec3::ZERO, NeighborVoxels::default());
        for tri in mesh.opaque.chunks(3) {
            assert_eq!(tri[0].barycentric, [1.0, 0.0, 0.0]);
            assert_eq!(tri[1].barycentric, [0.0, 1.0, 0.0]);
            assert_eq!(tri[2].barycentric, [0.0, 0.0, 1.0]);
        }
        let (top_min, top_max) = tile_uv(TEX_GRASS_TOP);
        let top: Vec<_> = mesh
            .opaque
            .iter()
            .filter(|v| v.normal == [0.0, 1.0, 0.0])
            .collect();
        assert!(top.iter().all(|v| {
            v.uv[0] >= top_min.x && v.uv[0] <= top_max.x && v.uv[1] >= top_min.y && v.uv[1] <= top_max.y
        }));
    }

    #[test]
    fn building_blocks_sample_their_own_tile() {
        for ty in [BlockType::Brick, BlockType::Snow] {
            let voxels = single_block(ty, IVec3::new(6, 40, 6));
            let mesh = build(&voxels, IVec3::ZERO, NeighborVoxels::default());
            assert_eq!(mesh.face_count(), 6);

            let (min, max) = tile_uv(ty.id() as u32);
            assert!(mesh.opaque.iter().all(|v| {
                v.uv[0] >= min.x && v.uv[0] <= max.x && v.uv[1] >= min.y && v.uv[1] <= max.y
            }));
        }
    }

    #[test]
    fn build_chunk_requires_generated_neighbors() {
        let key = ColumnKey::new(0, 0);
        let chunk = Arc::new(Chunk::new(key));
        chunk.commit_generated(Voxels::filled(BlockType::Stone)).unwrap();

        let make = |side: Side| {
            let neighbor = Arc::new(Chunk::new(key.neighbor(side)));
            neighbor.commit_generated(Voxels::filled(BlockType::Stone)).unwrap();
            neighbor
        };
        let mut neighbors = ChunkNeighbors {
            left: make(Side::Left),
            right: make(Side::Right),
            front: make(Side::Front),
            back: make(Side::Back),
        };

        let mesh = build_chunk(&chunk, &neighbors).unwrap();
        assert_eq!(mesh.face_count(), 0);

        neighbors.front = Arc::new(Chunk::new(key.neighbor(Side::Front)));
        assert_eq!(
            build_chunk(&chunk, &neighbors).unwrap_err(),
            MeshError::NeighborNotGenerated {
                chunk: key,
                neighbor: ColumnKey::new(0, 1),
            }
        );
    }
}
