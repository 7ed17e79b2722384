//! # World Persistence
//!
//! Versioned on-disk encoding for chunks and world metadata.
//!
//! ## Layout
//!
//! ```text
//! <save_root>/<world_name>/world.toml          - metadata: name + seed
//! <save_root>/<world_name>/chunks/<x>_<z>.chunk - one file per chunk
//! ```
//!
//! ## Chunk Format
//!
//! An explicit little-endian header followed by the LZ4-compressed voxel
//! grid (size-prepended):
//!
//! ```text
//! magic "SCHK" | version u16 | chunk x i32 | chunk z i32
//! | width u16 | height u16 | lz4 payload
//! ```
//!
//! A missing file is not an error - it means the chunk was never saved and
//! triggers fresh generation. The chunk map and modified set are runtime
//! state and are never written to disk.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use strata_procedural::chunk::{ChunkCoord, ChunkData, CHUNK_HEIGHT, CHUNK_WIDTH};

/// Chunk file magic bytes.
const CHUNK_MAGIC: [u8; 4] = *b"SCHK";

/// Current chunk format version.
const CHUNK_FORMAT_VERSION: u16 = 1;

/// Chunk header size in bytes.
const CHUNK_HEADER_LEN: usize = 4 + 2 + 4 + 4 + 2 + 2;

/// World metadata file name.
const WORLD_META_FILE: &str = "world.toml";

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Underlying file operation failed.
    #[error("save file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk file does not start with the chunk magic.
    #[error("not a chunk file")]
    BadMagic,

    /// A chunk file was written by an unknown format version.
    #[error("unsupported chunk format version {0}")]
    UnsupportedVersion(u16),

    /// A chunk file's stored coordinate or dimensions disagree with the
    /// requested chunk.
    #[error("chunk header mismatch: expected {expected}, found {found}")]
    HeaderMismatch {
        /// What the loader asked for.
        expected: String,
        /// What the file carries.
        found: String,
    },

    /// The compressed payload is corrupt.
    #[error("chunk payload corrupt: {0}")]
    Corrupt(#[from] lz4_flex::block::DecompressError),

    /// The decompressed payload has the wrong size.
    #[error("chunk payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Expected grid size in bytes.
        expected: usize,
        /// Actual decompressed size.
        actual: usize,
    },

    /// World metadata is not valid TOML.
    #[error("world metadata corrupt: {0}")]
    MetaParse(#[from] toml::de::Error),

    /// World metadata could not be encoded.
    #[error("world metadata encoding failed: {0}")]
    MetaEncode(#[from] toml::ser::Error),
}

/// Durable world metadata.
///
/// Only the name and seed persist; chunk data lives in per-chunk files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    /// World name, doubling as the save directory name.
    pub name: String,
    /// World seed.
    pub seed: u64,
}

/// Directory a world's save lives in.
#[must_use]
pub fn world_dir(save_root: &Path, world_name: &str) -> PathBuf {
    save_root.join(world_name)
}

fn chunks_dir(save_root: &Path, world_name: &str) -> PathBuf {
    world_dir(save_root, world_name).join("chunks")
}

fn chunk_file(save_root: &Path, world_name: &str, coord: ChunkCoord) -> PathBuf {
    chunks_dir(save_root, world_name).join(format!("{}_{}.chunk", coord.x, coord.z))
}

/// Saves a chunk to its world's chunk directory.
///
/// # Errors
///
/// Returns [`PersistenceError::Io`] when the directory or file cannot be
/// written.
pub fn save_chunk(
    save_root: &Path,
    world_name: &str,
    chunk: &ChunkData,
) -> Result<(), PersistenceError> {
    fs::create_dir_all(chunks_dir(save_root, world_name))?;

    let mut encoded = Vec::with_capacity(CHUNK_HEADER_LEN);
    encoded.extend_from_slice(&CHUNK_MAGIC);
    encoded.extend_from_slice(&CHUNK_FORMAT_VERSION.to_le_bytes());
    encoded.extend_from_slice(&chunk.coord.x.to_le_bytes());
    encoded.extend_from_slice(&chunk.coord.z.to_le_bytes());
    encoded.extend_from_slice(&(CHUNK_WIDTH as u16).to_le_bytes());
    encoded.extend_from_slice(&(CHUNK_HEIGHT as u16).to_le_bytes());
    encoded.extend_from_slice(&compress_prepend_size(chunk.as_bytes()));

    let path = chunk_file(save_root, world_name, chunk.coord);
    let mut file = fs::File::create(&path)?;
    file.write_all(&encoded)?;

    debug!(x = chunk.coord.x, z = chunk.coord.z, "chunk saved");
    Ok(())
}

/// Loads a chunk from its world's chunk directory.
///
/// Returns `Ok(None)` when no save exists for the coordinate - the caller
/// generates a fresh chunk instead.
///
/// # Errors
///
/// Returns a [`PersistenceError`] when a file exists but cannot be decoded.
pub fn load_chunk(
    save_root: &Path,
    world_name: &str,
    coord: ChunkCoord,
) -> Result<Option<ChunkData>, PersistenceError> {
    let path = chunk_file(save_root, world_name, coord);
    if !path.exists() {
        return Ok(None);
    }

    let mut encoded = Vec::new();
    fs::File::open(&path)?.read_to_end(&mut encoded)?;

    if encoded.len() < CHUNK_HEADER_LEN {
        return Err(PersistenceError::BadMagic);
    }
    if encoded[0..4] != CHUNK_MAGIC {
        return Err(PersistenceError::BadMagic);
    }

    let version = u16::from_le_bytes([encoded[4], encoded[5]]);
    if version != CHUNK_FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }

    let stored_x = i32::from_le_bytes([encoded[6], encoded[7], encoded[8], encoded[9]]);
    let stored_z = i32::from_le_bytes([encoded[10], encoded[11], encoded[12], encoded[13]]);
    let width = u16::from_le_bytes([encoded[14], encoded[15]]);
    let height = u16::from_le_bytes([encoded[16], encoded[17]]);

    if stored_x != coord.x
        || stored_z != coord.z
        || width as usize != CHUNK_WIDTH
        || height as usize != CHUNK_HEIGHT
    {
        return Err(PersistenceError::HeaderMismatch {
            expected: format!("({}, {}) {}x{}", coord.x, coord.z, CHUNK_WIDTH, CHUNK_HEIGHT),
            found: format!("({stored_x}, {stored_z}) {width}x{height}"),
        });
    }

    let payload = decompress_size_prepended(&encoded[CHUNK_HEADER_LEN..])?;
    let chunk = ChunkData::from_bytes(coord, &payload).ok_or(PersistenceError::SizeMismatch {
        expected: ChunkData::data_size(),
        actual: payload.len(),
    })?;

    debug!(x = coord.x, z = coord.z, "chunk loaded");
    Ok(Some(chunk))
}

/// Writes the world metadata file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] when the directory or file cannot be
/// written or the metadata cannot be encoded.
pub fn save_world_meta(save_root: &Path, meta: &WorldMeta) -> Result<(), PersistenceError> {
    let dir = world_dir(save_root, &meta.name);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(WORLD_META_FILE), toml::to_string(meta)?)?;
    Ok(())
}

/// Loads the world metadata, creating a fresh save when none exists.
///
/// # Errors
///
/// Returns a [`PersistenceError`] when an existing metadata file cannot be
/// read, or a fresh one cannot be written.
pub fn load_world(
    save_root: &Path,
    world_name: &str,
    default_seed: u64,
) -> Result<WorldMeta, PersistenceError> {
    let path = world_dir(save_root, world_name).join(WORLD_META_FILE);

    if path.exists() {
        let meta: WorldMeta = toml::from_str(&fs::read_to_string(&path)?)?;
        info!(world = %world_name, seed = meta.seed, "world found, loading from save");
        return Ok(meta);
    }

    info!(world = %world_name, seed = default_seed, "world not found, generating new world");
    let meta = WorldMeta {
        name: world_name.to_owned(),
        seed: default_seed,
    };
    save_world_meta(save_root, &meta)?;
    Ok(meta)
}

/// Deletes a world's save directory, if one exists.
///
/// # Errors
///
/// Returns [`PersistenceError::Io`] when the directory exists but cannot be
/// removed.
pub fn delete_world_save(save_root: &Path, world_name: &str) -> Result<(), PersistenceError> {
    let dir = world_dir(save_root, world_name);
    if dir.exists() {
        info!(world = %world_name, "deleting world save");
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_procedural::chunk::VoxelState;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_round_trip() {
        let dir = TempDir::new().unwrap();
        let coord = ChunkCoord::new(3, -7);

        let mut chunk = ChunkData::new(coord);
        chunk.set_voxel(0, 0, 0, VoxelState::new(1));
        chunk.set_voxel(5, 60, 5, VoxelState::new(3));
        chunk.set_voxel(15, 127, 15, VoxelState::new(9));

        save_chunk(dir.path(), "test", &chunk).unwrap();
        let loaded = load_chunk(dir.path(), "test", coord).unwrap().unwrap();

        assert_eq!(loaded.coord, coord);
        assert_eq!(loaded.as_bytes(), chunk.as_bytes());
    }

    #[test]
    fn test_missing_chunk_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_chunk(dir.path(), "test", ChunkCoord::new(1, 1)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_chunk_is_an_error() {
        let dir = TempDir::new().unwrap();
        let coord = ChunkCoord::new(0, 0);

        let path = chunk_file(dir.path(), "test", coord);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a chunk at all").unwrap();

        assert!(matches!(
            load_chunk(dir.path(), "test", coord),
            Err(PersistenceError::BadMagic)
        ));
    }

    #[test]
    fn test_coordinate_mismatch_is_an_error() {
        let dir = TempDir::new().unwrap();
        let chunk = ChunkData::new(ChunkCoord::new(2, 2));
        save_chunk(dir.path(), "test", &chunk).unwrap();

        // Read the (2, 2) file back as (2, 3) by renaming it.
        let from = chunk_file(dir.path(), "test", ChunkCoord::new(2, 2));
        let to = chunk_file(dir.path(), "test", ChunkCoord::new(2, 3));
        fs::rename(from, to).unwrap();

        assert!(matches!(
            load_chunk(dir.path(), "test", ChunkCoord::new(2, 3)),
            Err(PersistenceError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_unsupported_version_is_an_error() {
        let dir = TempDir::new().unwrap();
        let coord = ChunkCoord::new(0, 0);
        let chunk = ChunkData::new(coord);
        save_chunk(dir.path(), "test", &chunk).unwrap();

        let path = chunk_file(dir.path(), "test", coord);
        let mut bytes = fs::read(&path).unwrap();
        bytes[4] = 0xFF;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            load_chunk(dir.path(), "test", coord),
            Err(PersistenceError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_world_meta_round_trip() {
        let dir = TempDir::new().unwrap();

        let created = load_world(dir.path(), "alpha", 42).unwrap();
        assert_eq!(created.seed, 42);

        // A second load must come from disk, keeping the original seed.
        let loaded = load_world(dir.path(), "alpha", 999).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_delete_world_save() {
        let dir = TempDir::new().unwrap();

        let chunk = ChunkData::new(ChunkCoord::new(0, 0));
        save_chunk(dir.path(), "doomed", &chunk).unwrap();
        load_world(dir.path(), "doomed", 1).unwrap();
        assert!(world_dir(dir.path(), "doomed").exists());

        delete_world_save(dir.path(), "doomed").unwrap();
        assert!(!world_dir(dir.path(), "doomed").exists());

        // Deleting a missing save is a no-op.
        delete_world_save(dir.path(), "doomed").unwrap();
    }
}
