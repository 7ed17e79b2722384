//! # Chunk Store
//!
//! The sparse chunk map and its load-or-generate-or-populate logic.
//!
//! ## Locking
//!
//! All access to the map and the modified set happens under one exclusive
//! lock - the chunk-map domain - because the store is read and written from
//! both the primary loop and the background worker. Chunk creation completes
//! synchronously inside [`ChunkStore::request_chunk`]: a coordinate key
//! always maps to a fully populated [`ChunkData`], never a partial one.
//!
//! Structure batches produced while populating a chunk are queued on the
//! store and drained later by the streaming scheduler; the queue has its own
//! lock and is never acquired while the chunk-map lock is held.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use strata_procedural::biome::BiomeProfile;
use strata_procedural::blocks::BlockCatalog;
use strata_procedural::chunk::{
    is_chunk_in_world, is_voxel_in_world, ChunkCoord, ChunkData, VoxelState, CHUNK_HEIGHT,
    CHUNK_WIDTH,
};
use strata_procedural::structure::StructureBatch;
use strata_procedural::terrain::TerrainGenerator;

use crate::config::WorldSettings;
use crate::persistence::{self, PersistenceError, WorldMeta};

/// Map + modified set, guarded together by the chunk-map lock.
struct WorldState {
    /// The sparse chunk map. Each entry is the single owner of its chunk.
    chunks: HashMap<ChunkCoord, ChunkData>,
    /// Chunks with unsaved edits. Set semantics: a chunk is listed once
    /// regardless of edit count.
    modified: HashSet<ChunkCoord>,
}

/// The process-wide owner of world voxel data.
pub struct ChunkStore {
    settings: Arc<WorldSettings>,
    catalog: Arc<BlockCatalog>,
    meta: WorldMeta,
    generator: TerrainGenerator,
    state: Mutex<WorldState>,
    modifications: Mutex<VecDeque<StructureBatch>>,
}

impl ChunkStore {
    /// Opens a world: loads (or creates) its metadata and builds the terrain
    /// generator. A persisted world's stored seed overrides the configured
    /// one, so a reopened world regenerates identically.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when existing world metadata cannot be
    /// read or fresh metadata cannot be written.
    pub fn new(
        settings: Arc<WorldSettings>,
        biome: Arc<BiomeProfile>,
        catalog: Arc<BlockCatalog>,
    ) -> Result<Self, PersistenceError> {
        let meta = if settings.no_persistence {
            WorldMeta {
                name: settings.world_name.clone(),
                seed: settings.seed,
            }
        } else {
            persistence::load_world(&settings.save_root, &settings.world_name, settings.seed)?
        };

        let generator = TerrainGenerator::new(settings.generator_config(meta.seed), biome);

        Ok(Self {
            settings,
            catalog,
            meta,
            generator,
            state: Mutex::new(WorldState {
                chunks: HashMap::new(),
                modified: HashSet::new(),
            }),
            modifications: Mutex::new(VecDeque::new()),
        })
    }

    /// The world metadata this store was opened with.
    #[must_use]
    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    /// The effective world seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.meta.seed
    }

    /// The block catalog this world classifies against.
    #[must_use]
    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    /// Ensures a chunk exists, returning whether it does after the call.
    ///
    /// An existing chunk is left untouched. An absent chunk is loaded from
    /// the save, or generated and populated, when `create` is set; without
    /// `create` the call reports `false` and the caller handles the miss.
    pub fn request_chunk(&self, coord: ChunkCoord, create: bool) -> bool {
        if !is_chunk_in_world(coord) {
            return false;
        }

        let mut batches = Vec::new();
        let present = {
            let mut state = self.state.lock();
            if state.chunks.contains_key(&coord) {
                true
            } else if create {
                self.load_or_generate(&mut state, coord, &mut batches);
                true
            } else {
                false
            }
        };

        if !batches.is_empty() {
            self.modifications.lock().extend(batches);
        }
        present
    }

    /// Runs a closure against a chunk's data, without creating it.
    pub fn with_chunk<R>(&self, coord: ChunkCoord, f: impl FnOnce(&ChunkData) -> R) -> Option<R> {
        self.state.lock().chunks.get(&coord).map(f)
    }

    /// Clones a chunk's data out of the map, without creating it.
    #[must_use]
    pub fn clone_chunk(&self, coord: ChunkCoord) -> Option<ChunkData> {
        self.state.lock().chunks.get(&coord).cloned()
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// Reads the voxel at a world position, creating the owning chunk if
    /// necessary. Out-of-world positions read as `None`.
    #[must_use]
    pub fn get_voxel(&self, pos: [i32; 3]) -> Option<VoxelState> {
        let [x, y, z] = pos;
        if !is_voxel_in_world(x, y, z) {
            return None;
        }

        let coord = ChunkCoord::from_world(x, z);
        let mut batches = Vec::new();
        let voxel = {
            let mut state = self.state.lock();
            self.load_or_generate_if_absent(&mut state, coord, &mut batches);
            let chunk = state.chunks.get(&coord);
            chunk.map(|c| {
                c.voxel(
                    (x - coord.world_x()) as usize,
                    y as usize,
                    (z - coord.world_z()) as usize,
                )
            })
        };

        if !batches.is_empty() {
            self.modifications.lock().extend(batches);
        }
        voxel
    }

    /// Writes the voxel at a world position, creating the owning chunk if
    /// necessary, and marks the chunk modified.
    ///
    /// Returns the owning chunk coordinate, or `None` for out-of-world
    /// positions (a silent no-op).
    pub fn set_voxel(&self, pos: [i32; 3], id: u8) -> Option<ChunkCoord> {
        let [x, y, z] = pos;
        if !is_voxel_in_world(x, y, z) {
            return None;
        }

        let coord = ChunkCoord::from_world(x, z);
        let mut batches = Vec::new();
        {
            let mut state = self.state.lock();
            self.load_or_generate_if_absent(&mut state, coord, &mut batches);
            if let Some(chunk) = state.chunks.get_mut(&coord) {
                chunk.set_voxel(
                    (x - coord.world_x()) as usize,
                    y as usize,
                    (z - coord.world_z()) as usize,
                    VoxelState::new(id),
                );
            }
            state.modified.insert(coord);
        }

        if !batches.is_empty() {
            self.modifications.lock().extend(batches);
        }
        Some(coord)
    }

    /// Returns whether the voxel at a world position is solid.
    /// Out-of-world positions are not solid.
    #[must_use]
    pub fn is_voxel_solid(&self, pos: [i32; 3]) -> bool {
        self.get_voxel(pos)
            .is_some_and(|v| self.catalog.is_solid(v.id))
    }

    /// Returns whether the voxel at a world position is transparent.
    /// Out-of-world positions are not transparent.
    #[must_use]
    pub fn is_voxel_transparent(&self, pos: [i32; 3]) -> bool {
        self.get_voxel(pos)
            .is_some_and(|v| self.catalog.is_transparent(v.id))
    }

    /// Adds a chunk to the modified set. Idempotent.
    pub fn mark_modified(&self, coord: ChunkCoord) {
        self.state.lock().modified.insert(coord);
    }

    /// The chunks currently carrying unsaved edits.
    #[must_use]
    pub fn modified_chunks(&self) -> Vec<ChunkCoord> {
        self.state.lock().modified.iter().copied().collect()
    }

    /// Ensures every chunk within `radius` of `center` is resident.
    pub fn preload(&self, center: ChunkCoord, radius: i32) {
        for x in (center.x - radius)..(center.x + radius) {
            for z in (center.z - radius)..(center.z + radius) {
                self.request_chunk(ChunkCoord::new(x, z), true);
            }
        }
    }

    /// Appends structure batches to the modification queue.
    pub fn enqueue_modifications(&self, batches: Vec<StructureBatch>) {
        self.modifications.lock().extend(batches);
    }

    /// Pops the oldest structure batch, if any.
    #[must_use]
    pub fn pop_modification_batch(&self) -> Option<StructureBatch> {
        self.modifications.lock().pop_front()
    }

    /// Number of batches waiting in the modification queue.
    #[must_use]
    pub fn pending_modification_batches(&self) -> usize {
        self.modifications.lock().len()
    }

    /// Saves the world metadata and flushes every modified chunk to disk,
    /// clearing the modified set. Returns the number of chunks written.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when a write fails; chunks flushed
    /// before the failure stay saved.
    pub fn save_world(&self) -> Result<usize, PersistenceError> {
        if self.settings.no_persistence {
            info!("persistence disabled, nothing saved");
            return Ok(0);
        }

        persistence::save_world_meta(&self.settings.save_root, &self.meta)?;

        let to_save: Vec<ChunkData> = {
            let mut state = self.state.lock();
            let coords: Vec<ChunkCoord> = state.modified.drain().collect();
            coords
                .iter()
                .filter_map(|c| state.chunks.get(c).cloned())
                .collect()
        };

        for chunk in &to_save {
            persistence::save_chunk(&self.settings.save_root, &self.meta.name, chunk)?;
        }

        info!(count = to_save.len(), "chunks saved");
        Ok(to_save.len())
    }

    /// Deletes this world's save directory.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when the directory cannot be removed.
    pub fn delete_world_save(&self) -> Result<(), PersistenceError> {
        persistence::delete_world_save(&self.settings.save_root, &self.meta.name)
    }

    fn load_or_generate_if_absent(
        &self,
        state: &mut WorldState,
        coord: ChunkCoord,
        sink: &mut Vec<StructureBatch>,
    ) {
        if !state.chunks.contains_key(&coord) {
            self.load_or_generate(state, coord, sink);
        }
    }

    /// Loads a persisted chunk, or generates and populates a fresh one.
    /// Runs under the chunk-map lock so the inserted entry is complete
    /// before any other caller can observe the coordinate.
    fn load_or_generate(
        &self,
        state: &mut WorldState,
        coord: ChunkCoord,
        sink: &mut Vec<StructureBatch>,
    ) {
        if !self.settings.no_persistence {
            match persistence::load_chunk(&self.settings.save_root, &self.meta.name, coord) {
                Ok(Some(chunk)) => {
                    state.chunks.insert(coord, chunk);
                    return;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(x = coord.x, z = coord.z, %error, "chunk load failed, regenerating");
                }
            }
        }

        let chunk = self.populate(coord, sink);
        state.chunks.insert(coord, chunk);
        state.modified.insert(coord);
        debug!(x = coord.x, z = coord.z, "chunk generated");
    }

    /// Fills every cell of a fresh chunk through the terrain classifier.
    fn populate(&self, coord: ChunkCoord, sink: &mut Vec<StructureBatch>) -> ChunkData {
        let mut chunk = ChunkData::new(coord);
        let world_x = coord.world_x();
        let world_z = coord.world_z();

        for y in 0..CHUNK_HEIGHT {
            for x in 0..CHUNK_WIDTH {
                for z in 0..CHUNK_WIDTH {
                    let id = self.generator.classify(
                        world_x + x as i32,
                        y as i32,
                        world_z + z as i32,
                        sink,
                    );
                    chunk.set_voxel(x, y, z, VoxelState::new(id));
                }
            }
        }

        chunk
    }
}
