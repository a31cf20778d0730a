use bytemuck::{Pod, Zeroable};

use crate::constants::VERTEX_STRIDE;

/// Interleaved vertex, 12 floats: position, normal, barycentric, uv, light.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub barycentric: [f32; 3],
    pub uv: [f32; 2],
    pub light: f32,
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_STRIDE * std::mem::size_of::<f32>());

impl Vertex {
    /// Flat float view for upload.
    pub fn as_floats(vertices: &[Vertex]) -> &[f32] {
        bytemuck::cast_slice(vertices)
    }
}
