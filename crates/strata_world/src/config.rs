//! # World Settings
//!
//! Runtime configuration for a world: seed, generation strategy, streaming
//! distances, threading mode, and persistence switches. Loaded once at
//! startup from TOML; every field has a tuned default so a partial
//! file (or none at all) still yields a playable world.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use strata_procedural::terrain::{GeneratorConfig, NoiseStrategy, SubsurfaceMode};

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for [`WorldSettings`].
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How the update/apply work is scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadingMode {
    /// All work runs inline on the control tick.
    #[default]
    Single,
    /// A background worker continuously drains modifications and chunk
    /// updates while the primary loop handles creation and drawing.
    Worker,
}

/// Configuration for one world instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Save-directory name of this world.
    pub world_name: String,
    /// World seed. A persisted world's stored seed takes precedence.
    pub seed: u64,
    /// Surface height strategy.
    pub strategy: NoiseStrategy,
    /// Subsurface classification mode.
    pub subsurface: SubsurfaceMode,
    /// Update/apply scheduling mode.
    pub threading: ThreadingMode,
    /// Disables the vegetation pass entirely.
    pub no_vegetation: bool,
    /// Disables chunk/world loading and saving.
    pub no_persistence: bool,
    /// Radius of the active window around the observer, in chunks.
    pub view_distance_in_chunks: i32,
    /// Radius of the startup preload pass, in chunks.
    pub load_distance_in_chunks: i32,
    /// Lower bound of the layered-noise offset range.
    pub offset_value_minimum: f64,
    /// Upper bound of the layered-noise offset range.
    pub offset_value_maximum: f64,
    /// Layer count for the layered-Perlin strategies.
    pub layers: u32,
    /// Root directory world saves live under.
    pub save_root: PathBuf,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            world_name: "world".to_owned(),
            seed: 0,
            strategy: NoiseStrategy::Perlin,
            subsurface: SubsurfaceMode::Simplified,
            threading: ThreadingMode::Single,
            no_vegetation: false,
            no_persistence: false,
            view_distance_in_chunks: 4,
            load_distance_in_chunks: 8,
            offset_value_minimum: 0.01,
            offset_value_maximum: 0.1,
            layers: 3,
            save_root: PathBuf::from("saves"),
        }
    }
}

impl WorldSettings {
    /// Parses settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid settings TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The generator tuning these settings describe, for the given seed.
    ///
    /// The seed is passed separately because a persisted world's stored seed
    /// overrides the configured one.
    #[must_use]
    pub fn generator_config(&self, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            seed,
            strategy: self.strategy,
            subsurface: self.subsurface,
            vegetation: !self.no_vegetation,
            layers: self.layers,
            offset_minimum: self.offset_value_minimum,
            offset_maximum: self.offset_value_maximum,
        }
    }
}
