//! # Terrain Generator
//!
//! The per-voxel classification state machine. Given a world position it
//! produces a block id, and - only on surface voxels that pass the
//! vegetation gates - emits deferred structure batches into a caller-owned
//! sink.
//!
//! ## Passes
//!
//! 1. **Immutable**: out-of-world is air, the world floor is bedrock
//! 2. **Surface**: the column height comes from the configured noise strategy
//! 3. **Subsurface**: height banding, or ordered ore-lode lookup over
//!    approximated 3D noise
//! 4. **Vegetation**: band-selected ground cover and structure batches
//!
//! Classification is pure: same seed, same strategy, same output, across
//! calls and across process restarts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::biome::{BiomeProfile, RockLayer};
use crate::chunk::{is_voxel_in_world, WORLD_SIZE_IN_CHUNKS};
use crate::noise::{diamond_square, NoiseField};
use crate::structure::{make_bush, make_cactus, make_tree, StructureBatch};

/// Fallback surface height when no recognized strategy is configured.
const FALLBACK_TERRAIN_HEIGHT: i32 = 100;

/// Height offset compensating the unnormalized layered-Perlin accumulation.
const LAYERED_HEIGHT_OFFSET: i32 = 25;

/// Roughness of the precomputed diamond-square heightfield.
const DIAMOND_SQUARE_ROUGHNESS: f64 = 1.5;

/// The noise strategy that decides each column's surface height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseStrategy {
    /// A single 2D Perlin sample scaled by the biome height span.
    #[default]
    Perlin,
    /// Layered 2D Perlin, height-offset to compensate the unnormalized sum.
    LayeredPerlin,
    /// Lookup into the precomputed diamond-square table, digit-truncated.
    DiamondSquare,
    /// Mean of the layered-Perlin height and its digit-truncated value.
    Combined,
    /// A flat world at the fallback height. Unrecognized strategy names in
    /// config deserialize here.
    #[serde(other)]
    Fixed,
}

/// The subsurface classification mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsurfaceMode {
    /// Pure height banding. Cheaper; no ore lodes.
    #[default]
    Simplified,
    /// Ordered lode lookup over approximated 3D noise.
    Advanced,
}

/// Tuning for one [`TerrainGenerator`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// World seed.
    pub seed: u64,
    /// Surface height strategy.
    pub strategy: NoiseStrategy,
    /// Subsurface classification mode.
    pub subsurface: SubsurfaceMode,
    /// Whether the vegetation pass runs at all.
    pub vegetation: bool,
    /// Layer count for the layered-Perlin strategies.
    pub layers: u32,
    /// Lower bound of the per-layer offset range.
    pub offset_minimum: f64,
    /// Upper bound of the per-layer offset range.
    pub offset_maximum: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            strategy: NoiseStrategy::Perlin,
            subsurface: SubsurfaceMode::Simplified,
            vegetation: true,
            layers: 3,
            offset_minimum: 0.01,
            offset_maximum: 0.1,
        }
    }
}

/// The vegetation outcome for one terrain-height band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VegetationBand {
    /// Surface block override, if the band replaces the ground cover.
    pub ground_cover: Option<u8>,
    /// The structure this band spawns when the placement gate passes.
    pub structure: StructureKind,
}

/// The structure kinds the vegetation pass can spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureKind {
    /// Spruce tree (wood 34, leaves 33), snow band.
    SpruceTree,
    /// Redwood tree (wood 36, leaves 35), yellow-grass band.
    RedwoodTree,
    /// Cactus stack, sand band.
    Cactus,
    /// Single bush block, dry-clay band.
    Bush,
    /// Oak tree (wood 32, leaves 31), the default band.
    OakTree,
}

impl StructureKind {
    /// Builds this structure's modification batch at a surface position.
    #[must_use]
    pub fn build(self, noise: &NoiseField, position: [i32; 3], biome: &BiomeProfile) -> StructureBatch {
        let min = biome.minimum_vegetation_height;
        let max = biome.maximum_vegetation_height;
        match self {
            Self::SpruceTree => make_tree(noise, position, min, max, 34, 33),
            Self::RedwoodTree => make_tree(noise, position, min, max, 36, 35),
            Self::OakTree => make_tree(noise, position, min, max, 32, 31),
            Self::Cactus => make_cactus(position),
            Self::Bush => make_bush(position),
        }
    }
}

/// Selects the vegetation band for a terrain height.
///
/// Bands: (50,54] snow + spruce, (54,60] yellow grass + redwood,
/// (60,66] sand + cactus, (66,inf) dry clay + bush; everything else
/// (including heights at or below 50) spawns oak with no ground override.
#[must_use]
pub const fn vegetation_band(terrain_height: i32) -> VegetationBand {
    match terrain_height {
        51..=54 => VegetationBand {
            ground_cover: Some(6),
            structure: StructureKind::SpruceTree,
        },
        55..=60 => VegetationBand {
            ground_cover: Some(41),
            structure: StructureKind::RedwoodTree,
        },
        61..=66 => VegetationBand {
            ground_cover: Some(5),
            structure: StructureKind::Cactus,
        },
        h if h > 66 => VegetationBand {
            ground_cover: Some(28),
            structure: StructureKind::Bush,
        },
        _ => VegetationBand {
            ground_cover: None,
            structure: StructureKind::OakTree,
        },
    }
}

/// Truncates a height to its top two decimal digits.
///
/// An explicit, intentional lossy compression of large heightfield values
/// into a small usable range. Heights below 1 clamp to 1 before the digit
/// count so the logarithm stays defined; a one-digit height passes through
/// unchanged.
#[must_use]
pub fn truncate_to_leading_digits(height: i32) -> i32 {
    let height = height.max(1);
    let digits = f64::from(height).log10().floor() as i32 + 1;
    if digits >= 2 {
        (f64::from(height) / 10f64.powi(digits - 2)).trunc() as i32
    } else {
        height
    }
}

/// The per-voxel terrain classifier.
pub struct TerrainGenerator {
    config: GeneratorConfig,
    biome: Arc<BiomeProfile>,
    noise: NoiseField,
    /// Flattened diamond-square heightfield, indexed by the product of the
    /// column coordinates. Empty unless the strategy reads it.
    diamond_square_table: Vec<f64>,
}

impl TerrainGenerator {
    /// Creates a generator, precomputing the diamond-square table when the
    /// configured strategy reads it.
    #[must_use]
    pub fn new(config: GeneratorConfig, biome: Arc<BiomeProfile>) -> Self {
        let diamond_square_table = if config.strategy == NoiseStrategy::DiamondSquare {
            // Sized (16 * world size + 1)^2, which strictly bounds every
            // in-world coordinate product.
            let points = 16 * WORLD_SIZE_IN_CHUNKS as usize;
            info!(points, "precomputing diamond-square heightfield");
            diamond_square(points, DIAMOND_SQUARE_ROUGHNESS, config.seed).flatten()
        } else {
            Vec::new()
        };

        info!(strategy = ?config.strategy, subsurface = ?config.subsurface, seed = config.seed, "terrain generator ready");

        Self {
            config,
            biome: Arc::clone(&biome),
            noise: NoiseField::new(config.seed),
            diamond_square_table,
        }
    }

    /// The noise field this generator samples from.
    #[must_use]
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// The biome profile this generator classifies against.
    #[must_use]
    pub fn biome(&self) -> &BiomeProfile {
        &self.biome
    }

    /// Computes the surface height of the column at `(x, z)`.
    #[must_use]
    pub fn terrain_height(&self, x: i32, z: i32) -> i32 {
        let xf = f64::from(x);
        let zf = f64::from(z);
        let biome = &*self.biome;

        match self.config.strategy {
            NoiseStrategy::Perlin => {
                (f64::from(biome.terrain_height)
                    * self.noise.perlin2d(xf, zf, 0.0, biome.terrain_scale))
                    as i32
                    + biome.solid_ground_height
            }
            NoiseStrategy::LayeredPerlin => {
                self.layered_height(xf, zf)
            }
            NoiseStrategy::DiamondSquare => {
                let height = self.diamond_square_table[(x * z) as usize] as i32;
                truncate_to_leading_digits(height)
            }
            NoiseStrategy::Combined => {
                let height = self.layered_height(xf, zf);
                (truncate_to_leading_digits(height) + height) / 2
            }
            NoiseStrategy::Fixed => FALLBACK_TERRAIN_HEIGHT,
        }
    }

    fn layered_height(&self, xf: f64, zf: f64) -> i32 {
        let biome = &*self.biome;
        (f64::from(biome.terrain_height)
            * self.noise.layered_perlin2d(
                xf,
                zf,
                self.config.offset_minimum,
                self.config.offset_maximum,
                biome.terrain_scale,
                self.config.layers,
            )) as i32
            + (biome.solid_ground_height - LAYERED_HEIGHT_OFFSET)
    }

    /// Classifies the voxel at a world position, pushing any structure
    /// batches the vegetation pass emits into `structures`.
    #[must_use]
    pub fn classify(&self, x: i32, y: i32, z: i32, structures: &mut Vec<StructureBatch>) -> u8 {
        // Immutable pass
        if !is_voxel_in_world(x, y, z) {
            return 0;
        }
        if y == 0 {
            return 1;
        }

        // Surface pass
        let terrain_height = self.terrain_height(x, z);
        if y > terrain_height {
            return 0;
        }

        // Subsurface pass
        let mut voxel = match self.config.subsurface {
            SubsurfaceMode::Simplified => self.simplified_generation(terrain_height, y),
            SubsurfaceMode::Advanced => self.advanced_generation(terrain_height, y, x, z),
        };

        // Vegetation pass
        if y == terrain_height && self.config.vegetation {
            voxel = self.vegetation_pass(x, z, terrain_height, voxel, structures);
        }

        voxel
    }

    /// Height-banded subsurface classification.
    ///
    /// The band boundaries silently redefine the stone tier ids (2, 8, 9)
    /// even when no lode logic is involved.
    fn simplified_generation(&self, terrain_height: i32, y: i32) -> u8 {
        let biome = &*self.biome;

        if y == terrain_height {
            3
        } else if y < terrain_height && y > terrain_height - 4 {
            4
        } else if y > biome.deep_stone_height {
            2
        } else if y > biome.deepest_stone_height {
            8
        } else if y > 0 {
            9
        } else {
            0
        }
    }

    /// Lode-based subsurface classification over approximated 3D noise.
    ///
    /// The first matching lode wins; a match outside its rock-layer band
    /// forces the band's stone id instead.
    fn advanced_generation(&self, terrain_height: i32, y: i32, x: i32, z: i32) -> u8 {
        let biome = &*self.biome;

        if y == terrain_height {
            return 3;
        }
        if y < terrain_height && y > terrain_height - 4 {
            return 4;
        }

        let position = [f64::from(x), f64::from(y), f64::from(z)];
        for lode in &biome.lodes {
            if self
                .noise
                .perlin3d_above_threshold(position, lode.noise_offset, lode.scale, lode.threshold)
            {
                return match lode.layer {
                    RockLayer::Any => lode.block_id,
                    RockLayer::Rock => {
                        if y > biome.deep_stone_height && y <= terrain_height - 4 {
                            lode.block_id
                        } else {
                            2
                        }
                    }
                    RockLayer::LowerRock => {
                        if y > biome.deepest_stone_height && y <= biome.deep_stone_height {
                            lode.block_id
                        } else {
                            8
                        }
                    }
                    RockLayer::LowestRock => {
                        if y > 0 && y <= biome.deepest_stone_height {
                            lode.block_id
                        } else {
                            9
                        }
                    }
                };
            }
        }

        0
    }

    /// Zone-gated vegetation: band ground cover plus a structure batch when
    /// the independent placement gate also passes.
    fn vegetation_pass(
        &self,
        x: i32,
        z: i32,
        terrain_height: i32,
        current: u8,
        structures: &mut Vec<StructureBatch>,
    ) -> u8 {
        let biome = &*self.biome;
        let xf = f64::from(x);
        let zf = f64::from(z);

        let zone = self.noise.perlin2d(xf, zf, 0.0, biome.vegetation_zone_scale);
        if zone <= biome.vegetation_zone_threshold {
            return current;
        }

        let band = vegetation_band(terrain_height);
        let placement = self
            .noise
            .perlin2d(xf, zf, 0.0, biome.vegetation_placement_scale);
        if placement > biome.vegetation_placement_threshold {
            structures.push(band.structure.build(
                &self.noise,
                [x, terrain_height, z],
                biome,
            ));
        }

        band.ground_cover.unwrap_or(current)
    }
}
