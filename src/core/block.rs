use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Block palette. Discriminants double as the default atlas tile index.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 4,
    Brick = 5,
    Sand = 6,
    Snow = 7,
    Log = 8,
    Leaves = 10,
    Bedrock = 13,
    Flower1 = 14,
    Flower2 = 15,
    Flower3 = 16,
    Flower4 = 17,
    IronOre = 18,
    CoalOre = 19,
    DiamondOre = 20,
    TallPlantTop = 21,
    TallPlantBottom = 22,
    GoldOre = 23,
    RedstoneOre = 24,
    EmeraldOre = 25,
    LapisOre = 26,
}

impl BlockType {
    pub const FLOWERS: [BlockType; 4] = [
        BlockType::Flower1,
        BlockType::Flower2,
        BlockType::Flower3,
        BlockType::Flower4,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_solid(&self) -> bool {
        !matches!(self, BlockType::Air) && !self.is_plant()
    }

    pub fn is_plant(&self) -> bool {
        matches!(
            self,
            BlockType::Flower1
                | BlockType::Flower2
                | BlockType::Flower3
                | BlockType::Flower4
                | BlockType::TallPlantTop
                | BlockType::TallPlantBottom
        )
    }

    pub fn is_ore(&self) -> bool {
        matches!(
            self,
            BlockType::IronOre
                | BlockType::CoalOre
                | BlockType::DiamondOre
                | BlockType::GoldOre
                | BlockType::RedstoneOre
                | BlockType::EmeraldOre
                | BlockType::LapisOre
        )
    }

    pub fn tex_top(&self) -> u32 {
        match self {
            BlockType::Grass => TEX_GRASS_TOP,
            BlockType::Log => TEX_LOG_TOP,
            _ => self.id() as u32,
        }
    }

    pub fn tex_side(&self) -> u32 {
        match self {
            BlockType::Grass => TEX_GRASS_SIDE,
            BlockType::Log => TEX_LOG_SIDE,
            _ => self.id() as u32,
        }
    }

    pub fn tex_bottom(&self) -> u32 {
        match self {
            BlockType::Grass => TEX_DIRT,
            BlockType::Log => TEX_LOG_TOP,
            _ => self.id() as u32,
        }
    }
}

/// A single voxel: its type plus a 0..=15 light level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Block {
    pub ty: BlockType,
    light: u8,
}

impl Block {
    pub const AIR: Block = Block {
        ty: BlockType::Air,
        light: 0,
    };

    pub fn new(ty: BlockType, light: u8) -> Self {
        Block {
            ty,
            light: light.min(MAX_LIGHT),
        }
    }

    pub fn light(&self) -> u8 {
        self.light
    }

    pub fn set_light(&mut self, level: u8) {
        self.light = level.min(MAX_LIGHT);
    }

    pub fn is_air(&self) -> bool {
        self.ty == BlockType::Air
    }

    pub fn is_solid(&self) -> bool {
        self.ty.is_solid()
    }
}
