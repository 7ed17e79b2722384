//! # Block Catalog
//!
//! Static per-block-type configuration: solidity, transparency, and the six
//! face-to-texture-atlas mappings the mesher samples from.
//!
//! The catalog is plain serde-described data supplied by the host's config
//! collaborator; [`BlockCatalog::default`] ships a complete default table.

use serde::{Deserialize, Serialize};
use tracing::error;

/// Texture atlas side length in block tiles.
pub const TEXTURE_ATLAS_SIZE_IN_BLOCKS: u16 = 16;

/// Normalized side length of one atlas tile.
#[must_use]
pub fn normalized_block_texture_size() -> f32 {
    1.0 / f32::from(TEXTURE_ATLAS_SIZE_IN_BLOCKS)
}

/// Face indices in the winding order the mesher emits faces in.
///
/// The order is: Back, Front, Top, Bottom, Left, Right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum BlockFace {
    /// The back face (facing negative Z).
    Back = 0,
    /// The front face (facing positive Z).
    Front = 1,
    /// The top face (facing positive Y).
    Top = 2,
    /// The bottom face (facing negative Y).
    Bottom = 3,
    /// The left face (facing negative X).
    Left = 4,
    /// The right face (facing positive X).
    Right = 5,
}

/// Static descriptor for one block type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockType {
    /// Display name.
    pub name: String,
    /// Whether the block occupies space.
    pub is_solid: bool,
    /// Whether neighboring faces show through this block.
    pub is_transparent: bool,
    /// Texture atlas index per face, in Back/Front/Top/Bottom/Left/Right order.
    pub faces: [u16; 6],
}

impl BlockType {
    /// Creates a block descriptor with per-face atlas indices.
    #[must_use]
    pub fn new(name: &str, is_solid: bool, is_transparent: bool, faces: [u16; 6]) -> Self {
        Self {
            name: name.to_owned(),
            is_solid,
            is_transparent,
            faces,
        }
    }

    /// Creates a block descriptor with the same atlas index on all faces.
    #[must_use]
    pub fn uniform(name: &str, is_solid: bool, is_transparent: bool, texture: u16) -> Self {
        Self::new(name, is_solid, is_transparent, [texture; 6])
    }

    /// Returns the atlas index for a face.
    ///
    /// An out-of-range face index is a programmer error; it is logged and
    /// falls back to face 0.
    #[must_use]
    pub fn texture_index(&self, face: usize) -> u16 {
        match self.faces.get(face) {
            Some(index) => *index,
            None => {
                error!(block = %self.name, face, "invalid face index in texture lookup");
                self.faces[0]
            }
        }
    }
}

/// The block-type table, indexed by block id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockCatalog {
    /// Block descriptors; the id is the index. Id 0 must be air.
    pub blocks: Vec<BlockType>,
}

impl BlockCatalog {
    /// Looks up a block descriptor by id.
    #[must_use]
    pub fn get(&self, id: u8) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    /// Returns whether the block id is solid. Unknown ids are not solid.
    #[must_use]
    pub fn is_solid(&self, id: u8) -> bool {
        self.get(id).is_some_and(|b| b.is_solid)
    }

    /// Returns whether the block id is transparent. Unknown ids read as
    /// transparent, matching the air default.
    #[must_use]
    pub fn is_transparent(&self, id: u8) -> bool {
        self.get(id).map_or(true, |b| b.is_transparent)
    }

    /// Returns the atlas index for a block face. Unknown ids map to tile 0.
    #[must_use]
    pub fn texture_index(&self, id: u8, face: usize) -> u16 {
        self.get(id).map_or(0, |b| b.texture_index(face))
    }

    /// Number of block types in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for BlockCatalog {
    /// The stock block table.
    ///
    /// Ids referenced by the terrain generator: 0 air, 1 bedrock, 2 stone,
    /// 3 grass, 4 dirt, 5 sand, 6 snow, 8/9 deep stone tiers, 28 dry clay,
    /// 41 yellow grass, wood/leaf pairs 31-36, 38 cactus, 39 bush.
    fn default() -> Self {
        let blocks = vec![
            BlockType::uniform("Air", false, true, 0),
            BlockType::uniform("Bedrock", true, false, 9),
            BlockType::uniform("Stone", true, false, 0),
            BlockType::new("Grass", true, false, [2, 2, 7, 1, 2, 2]),
            BlockType::uniform("Dirt", true, false, 1),
            BlockType::uniform("Sand", true, false, 10),
            BlockType::uniform("Snow", true, false, 11),
            BlockType::uniform("Gravel", true, false, 12),
            BlockType::uniform("Deep Stone", true, false, 13),
            BlockType::uniform("Deepest Stone", true, false, 14),
            BlockType::uniform("Coal Ore", true, false, 15),
            BlockType::uniform("Iron Ore", true, false, 16),
            BlockType::uniform("Gold Ore", true, false, 17),
            BlockType::uniform("Diamond Ore", true, false, 18),
            BlockType::uniform("Cobblestone", true, false, 19),
            BlockType::uniform("Planks", true, false, 4),
            BlockType::new("Log", true, false, [20, 20, 21, 21, 20, 20]),
            BlockType::uniform("Glass", true, true, 22),
            BlockType::uniform("Brick", true, false, 23),
            BlockType::new("Furnace", true, false, [25, 24, 25, 25, 25, 25]),
            BlockType::uniform("Mossy Cobblestone", true, false, 26),
            BlockType::uniform("Obsidian", true, false, 27),
            BlockType::uniform("Ice", true, true, 28),
            BlockType::uniform("Clay", true, false, 29),
            BlockType::uniform("Sandstone", true, false, 30),
            BlockType::uniform("Limestone", true, false, 31),
            BlockType::uniform("Granite", true, false, 32),
            BlockType::uniform("Marble", true, false, 33),
            BlockType::uniform("Dry Clay", true, false, 34),
            BlockType::uniform("Terracotta", true, false, 35),
            BlockType::uniform("Mud", true, false, 36),
            BlockType::uniform("Oak Leaves", true, true, 37),
            BlockType::new("Oak Wood", true, false, [38, 38, 39, 39, 38, 38]),
            BlockType::uniform("Spruce Leaves", true, true, 40),
            BlockType::new("Spruce Wood", true, false, [41, 41, 42, 42, 41, 41]),
            BlockType::uniform("Redwood Leaves", true, true, 43),
            BlockType::new("Redwood Wood", true, false, [44, 44, 45, 45, 44, 44]),
            BlockType::uniform("Dead Shrub", true, true, 46),
            BlockType::new("Cactus", true, true, [47, 47, 48, 48, 47, 47]),
            BlockType::uniform("Bush", true, true, 49),
            BlockType::uniform("Tall Grass", true, true, 50),
            BlockType::new("Yellow Grass", true, false, [51, 51, 52, 1, 51, 51]),
        ];
        Self { blocks }
    }
}
