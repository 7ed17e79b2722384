//! # Structure Placement
//!
//! Deferred multi-voxel modification batches emitted during terrain
//! generation and applied later against the world store.
//!
//! A batch is an ordered sequence of voxel writes. Batches are applied in
//! enqueue order, each batch fully drained before the next, so a structure
//! is never interleaved with another.

use std::collections::VecDeque;

use crate::noise::NoiseField;

/// One deferred voxel edit: a world position and the block id to write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelModification {
    /// World voxel position.
    pub position: [i32; 3],
    /// Block id to write.
    pub id: u8,
}

impl VoxelModification {
    /// Creates a new deferred edit.
    #[inline]
    #[must_use]
    pub const fn new(position: [i32; 3], id: u8) -> Self {
        Self { position, id }
    }
}

/// An ordered batch of deferred voxel edits.
pub type StructureBatch = VecDeque<VoxelModification>;

/// Block id of the cactus body.
const CACTUS_BLOCK: u8 = 38;
/// Block id of the bush block.
const BUSH_BLOCK: u8 = 39;

/// Builds a tree batch at the given surface position.
///
/// The trunk height is `max_trunk_height` scaled by a placement-noise sample
/// (offset 250, scale 3) and clamped up to `min_trunk_height`. One wood voxel
/// is emitted per trunk level above the base, then an unconditional 7x7x7
/// block of leaf voxels centered above the trunk top - the cube overwrites
/// air and trunk alike, no shape carving.
#[must_use]
pub fn make_tree(
    noise: &NoiseField,
    position: [i32; 3],
    min_trunk_height: i32,
    max_trunk_height: i32,
    wood_id: u8,
    leaf_id: u8,
) -> StructureBatch {
    let mut queue = StructureBatch::new();

    let sample = noise.perlin2d(f64::from(position[0]), f64::from(position[2]), 250.0, 3.0);
    let mut height = (f64::from(max_trunk_height) * sample) as i32;
    if height < min_trunk_height {
        height = min_trunk_height;
    }

    for i in 1..height {
        queue.push_back(VoxelModification::new(
            [position[0], position[1] + i, position[2]],
            wood_id,
        ));
    }

    for x in -3..4 {
        for y in 0..7 {
            for z in -3..4 {
                queue.push_back(VoxelModification::new(
                    [position[0] + x, position[1] + height + y, position[2] + z],
                    leaf_id,
                ));
            }
        }
    }

    queue
}

/// Builds a cactus batch: a fixed three-voxel stack above the surface.
#[must_use]
pub fn make_cactus(position: [i32; 3]) -> StructureBatch {
    let mut queue = StructureBatch::new();

    for i in 1..4 {
        queue.push_back(VoxelModification::new(
            [position[0], position[1] + i, position[2]],
            CACTUS_BLOCK,
        ));
    }

    queue
}

/// Builds a bush batch: a single block above the surface.
#[must_use]
pub fn make_bush(position: [i32; 3]) -> StructureBatch {
    let mut queue = StructureBatch::new();

    queue.push_back(VoxelModification::new(
        [position[0], position[1] + 1, position[2]],
        BUSH_BLOCK,
    ));

    queue
}
