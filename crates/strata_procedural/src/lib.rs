//! # Strata Procedural Generation
//!
//! Deterministic voxel-terrain generation for bounded, reproducible worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: the same seed always produces the same world
//! 2. **Chunked**: terrain is classified voxel-by-voxel into fixed-size chunks
//! 3. **Pure**: classification has no side effects beyond an explicit
//!    structure-batch sink passed by the caller
//!
//! ## Core Components
//!
//! - [`noise::NoiseField`]: 2D Perlin, layered Perlin, a 3D threshold
//!   approximation, and diamond-square heightfields
//! - [`terrain::TerrainGenerator`]: produces a block id per voxel position
//! - [`structure`]: deferred multi-voxel modification batches (trees, cacti)
//! - [`biome::BiomeProfile`] / [`blocks::BlockCatalog`]: static configuration
//!
//! ## Example
//!
//! ```rust
//! use strata_procedural::biome::BiomeProfile;
//! use strata_procedural::terrain::{GeneratorConfig, TerrainGenerator};
//! use std::sync::Arc;
//!
//! let generator = TerrainGenerator::new(
//!     GeneratorConfig { seed: 42, ..GeneratorConfig::default() },
//!     Arc::new(BiomeProfile::default()),
//! );
//!
//! let mut structures = Vec::new();
//! let id = generator.classify(100, 0, 100, &mut structures);
//! assert_eq!(id, 1); // bedrock floor
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod biome;
pub mod blocks;
pub mod chunk;
pub mod noise;
pub mod structure;
pub mod terrain;

pub use biome::{BiomeProfile, Lode, RockLayer};
pub use blocks::{BlockCatalog, BlockType, TEXTURE_ATLAS_SIZE_IN_BLOCKS};
pub use chunk::{
    ChunkCoord, ChunkData, VoxelState, CHUNK_HEIGHT, CHUNK_WIDTH, WORLD_SIZE_IN_CHUNKS,
    WORLD_SIZE_IN_VOXELS,
};
pub use noise::{diamond_square, HeightField, NoiseField};
pub use structure::{StructureBatch, VoxelModification};
pub use terrain::{GeneratorConfig, NoiseStrategy, SubsurfaceMode, TerrainGenerator};
