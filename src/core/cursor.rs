//! Chunk-local read/write cursor used by the generator's flood fills.
//!
//! Neighbor enumeration never leaves the chunk the cursor is bound to: cells
//! past an edge are dropped, not redirected to an adjacent chunk.

use glam::IVec3;

use crate::core::block::{Block, BlockType};
use crate::core::chunk::Voxels;

pub struct BlockCursor<'a> {
    voxels: &'a mut Voxels,
    pos: IVec3,
}

impl<'a> BlockCursor<'a> {
    /// Binds a cursor to `pos`, or `None` if `pos` is outside the chunk.
    pub fn new(voxels: &'a mut Voxels, pos: IVec3) -> Option<Self> {
        Voxels::in_bounds(pos).then_some(BlockCursor { voxels, pos })
    }

    pub fn pos(&self) -> IVec3 {
        self.pos
    }

    /// Moves to another cell of the same chunk. Out-of-bounds targets leave the cursor put.
    pub fn move_to(&mut self, pos: IVec3) -> bool {
        if Voxels::in_bounds(pos) {
            self.pos = pos;
            true
        } else {
            false
        }
    }

    pub fn block(&self) -> Block {
        self.voxels.get(self.pos).unwrap_or(Block::AIR)
    }

    pub fn block_type(&self) -> BlockType {
        self.block().ty
    }

    pub fn set_type(&mut self, ty: BlockType) {
        self.voxels.set_type(self.pos, ty);
    }

    pub fn set_light(&mut self, level: u8) {
        self.voxels.set_light(self.pos, level);
    }

    /// Up to 26 surrounding cells inside the same chunk.
    pub fn neighbors(&self) -> impl Iterator<Item = IVec3> + use<> {
        neighbors_26(self.pos)
    }

    /// Up to 8 surrounding cells on the cursor's own Y level.
    pub fn neighbors_same_y(&self) -> impl Iterator<Item = IVec3> + use<> {
        let y = self.pos.y;
        neighbors_26(self.pos).filter(move |p| p.y == y)
    }
}

pub fn neighbors_26(center: IVec3) -> impl Iterator<Item = IVec3> {
    (-1..=1)
        .flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| IVec3::new(dx, dy, dz))))
        .filter(|offset| *offset != IVec3::ZERO)
        .map(move |offset| center + offset)
        .filter(|p| Voxels::in_bounds(*p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn interior_cell_has_26_neighbors() {
        let mut voxels = Voxels::new();
        let cursor = BlockCursor::new(&mut voxels, IVec3::new(5, 100, 5)).unwrap();
        assert_eq!(cursor.neighbors().count(), 26);
        assert_eq!(cursor.neighbors_same_y().count(), 8);
    }

    #[test]
    fn corner_neighbors_stay_inside_chunk() {
        let mut voxels = Voxels::new();
        let cursor = BlockCursor::new(&mut voxels, IVec3::new(0, 0, 0)).unwrap();
        let neighbors: Vec<_> = cursor.neighbors().collect();
        assert_eq!(neighbors.len(), 7);
        assert!(neighbors.iter().all(|p| Voxels::in_bounds(*p)));

        let cursor = BlockCursor::new(&mut voxels, IVec3::new(CHUNK_SIZE - 1, CHUNK_HEIGHT - 1, 0))
            .unwrap();
        assert_eq!(cursor.neighbors().count(), 7);
    }

    #[test]
    fn writes_land_in_owning_array() {
        let mut voxels = Voxels::new();
        {
            let mut cursor = BlockCursor::new(&mut voxels, IVec3::new(2, 3, 4)).unwrap();
            cursor.set_type(BlockType::CoalOre);
            cursor.set_light(9);
            assert!(cursor.move_to(IVec3::new(2, 4, 4)));
            assert!(!cursor.move_to(IVec3::new(2, 4, 16)));
            assert_eq!(cursor.pos(), IVec3::new(2, 4, 4));
        }
        let block = voxels.get(IVec3::new(2, 3, 4)).unwrap();
        assert_eq!(block.ty, BlockType::CoalOre);
        assert_eq!(block.light(), 9);
    }

    #[test]
    fn cursor_rejects_out_of_bounds_start() {
        let mut voxels = Voxels::new();
        assert!(BlockCursor::new(&mut voxels, IVec3::new(-1, 0, 0)).is_none());
    }
}
