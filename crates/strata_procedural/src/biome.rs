//! # Biome Profile
//!
//! Static per-biome tuning: height thresholds, noise scales, vegetation
//! gates, and the ordered ore-lode rules the advanced subsurface pass scans.
//!
//! Profiles are serde-described data supplied by the host's config
//! collaborator; [`BiomeProfile::default`] carries the default tuning.

use serde::{Deserialize, Serialize};

/// The rock-layer tier a lode is allowed to replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RockLayer {
    /// Any depth below the dirt band.
    Any,
    /// The upper stone band, down to `deep_stone_height`.
    Rock,
    /// The middle band, between `deepest_stone_height` and `deep_stone_height`.
    LowerRock,
    /// The deepest band, above bedrock up to `deepest_stone_height`.
    LowestRock,
}

/// An ore-placement rule.
///
/// Lodes are evaluated in order; the first whose 3D noise test matches wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lode {
    /// Display name.
    pub name: String,
    /// The rock-layer tier this lode targets.
    pub layer: RockLayer,
    /// Block id written where the lode matches inside its tier.
    pub block_id: u8,
    /// Noise frequency scale.
    pub scale: f64,
    /// Noise threshold above which the lode matches.
    pub threshold: f64,
    /// Noise domain offset, decorrelating this lode from the others.
    pub noise_offset: f64,
}

/// Static configuration for one biome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiomeProfile {
    /// Display name.
    pub name: String,
    /// Base height every terrain column is raised by.
    pub solid_ground_height: i32,
    /// Height span the terrain noise is scaled into, above the base.
    pub terrain_height: i32,
    /// Upper bound of the middle stone band.
    pub deep_stone_height: i32,
    /// Upper bound of the deepest stone band.
    pub deepest_stone_height: i32,
    /// Frequency scale for the terrain-height noise.
    pub terrain_scale: f64,
    /// Frequency scale for the vegetation zone gate.
    pub vegetation_zone_scale: f64,
    /// Threshold the zone noise must exceed for any vegetation.
    pub vegetation_zone_threshold: f64,
    /// Frequency scale for per-column vegetation placement.
    pub vegetation_placement_scale: f64,
    /// Threshold the placement noise must exceed to spawn a structure.
    pub vegetation_placement_threshold: f64,
    /// Tallest trunk a tree batch may request.
    pub maximum_vegetation_height: i32,
    /// Shortest trunk a tree batch is clamped to.
    pub minimum_vegetation_height: i32,
    /// Ordered ore-lode rules for the advanced subsurface pass.
    pub lodes: Vec<Lode>,
}

impl Default for BiomeProfile {
    /// The default highlands tuning.
    fn default() -> Self {
        Self {
            name: "Highlands".to_owned(),
            solid_ground_height: 60,
            terrain_height: 64,
            deep_stone_height: 30,
            deepest_stone_height: 15,
            terrain_scale: 50.0,
            vegetation_zone_scale: 1.3,
            vegetation_zone_threshold: 0.6,
            vegetation_placement_scale: 15.0,
            vegetation_placement_threshold: 0.8,
            maximum_vegetation_height: 12,
            minimum_vegetation_height: 5,
            lodes: vec![
                Lode {
                    name: "Coal".to_owned(),
                    layer: RockLayer::Rock,
                    block_id: 10,
                    scale: 0.1,
                    threshold: 0.54,
                    noise_offset: 0.0,
                },
                Lode {
                    name: "Iron".to_owned(),
                    layer: RockLayer::LowerRock,
                    block_id: 11,
                    scale: 0.12,
                    threshold: 0.56,
                    noise_offset: 150.0,
                },
                Lode {
                    name: "Gold".to_owned(),
                    layer: RockLayer::LowestRock,
                    block_id: 12,
                    scale: 0.14,
                    threshold: 0.58,
                    noise_offset: 300.0,
                },
                Lode {
                    name: "Diamond".to_owned(),
                    layer: RockLayer::LowestRock,
                    block_id: 13,
                    scale: 0.16,
                    threshold: 0.6,
                    noise_offset: 450.0,
                },
                Lode {
                    name: "Caves".to_owned(),
                    layer: RockLayer::Any,
                    block_id: 0,
                    scale: 0.08,
                    threshold: 0.62,
                    noise_offset: 600.0,
                },
            ],
        }
    }
}
