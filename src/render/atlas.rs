use glam::Vec2;

use crate::constants::ATLAS_TILES;
use crate::core::block::BlockType;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FaceType {
    Top,
    Bottom,
    Side,
}

/// Atlas tile shown on one face of a block.
pub fn tile_for(block: BlockType, face: FaceType) -> u32 {
    match face {
        FaceType::Top => block.tex_top(),
        FaceType::Bottom => block.tex_bottom(),
        FaceType::Side => block.tex_side(),
    }
}

/// UV rectangle `(min, max)` of an atlas tile. Tiles are numbered row-major
/// from the top-left of the image, so V is flipped for a bottom-left origin.
pub fn tile_uv(index: u32) -> (Vec2, Vec2) {
    let tiles = ATLAS_TILES as f32;
    let col = (index % ATLAS_TILES) as f32;
    let row = (index / ATLAS_TILES) as f32;

    let u0 = col / tiles;
    let u1 = (col + 1.0) / tiles;
    let v0 = 1.0 - (row + 1.0) / tiles;
    let v1 = 1.0 - row / tiles;

    (Vec2::new(u0, v0), Vec2::new(u1, v1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tile_is_top_left() {
        let (min, max) = tile_uv(0);
        assert_eq!(min, Vec2::new(0.0, 15.0 / 16.0));
        assert_eq!(max, Vec2::new(1.0 / 16.0, 1.0));
    }

    #[test]
    fn second_row_wraps() {
        let (min, max) = tile_uv(17);
        assert_eq!(min, Vec2::new(1.0 / 16.0, 14.0 / 16.0));
        assert_eq!(max, Vec2::new(2.0 / 16.0, 15.0 / 16.0));
    }

    #[test]
    fn grass_faces_use_distinct_tiles() {
        let top = tile_for(BlockType::Grass, FaceType::Top);
        let side = tile_for(BlockType::Grass, FaceType::Side);
        let bottom = tile_for(BlockType::Grass, FaceType::Bottom);
        assert_ne!(top, side);
        assert_ne!(side, bottom);
        assert_eq!(bottom, tile_for(BlockType::Dirt, FaceType::Top));

        let stone = tile_for(BlockType::Stone, FaceType::Side);
        assert_eq!(stone, tile_for(BlockType::Stone, FaceType::Top));
    }
}
