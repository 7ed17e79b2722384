//! End-to-end pipeline tests: structure batches flowing through the
//! modification queue into the store, the update cascade, worker-mode
//! draining, and persistence through the scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_procedural::biome::BiomeProfile;
use strata_procedural::blocks::BlockCatalog;
use strata_procedural::chunk::{ChunkCoord, CHUNK_WIDTH};
use strata_procedural::structure::{StructureBatch, VoxelModification};
use strata_world::config::{ThreadingMode, WorldSettings};
use strata_world::store::ChunkStore;
use strata_world::streaming::{ChunkPhase, ChunkStreamer};

fn memory_settings() -> WorldSettings {
    WorldSettings {
        no_persistence: true,
        no_vegetation: true,
        ..WorldSettings::default()
    }
}

fn streamer_with(settings: WorldSettings) -> Arc<ChunkStreamer> {
    let settings = Arc::new(settings);
    let store = Arc::new(
        ChunkStore::new(
            settings.clone(),
            Arc::new(BiomeProfile::default()),
            Arc::new(BlockCatalog::default()),
        )
        .unwrap(),
    );
    ChunkStreamer::new(store, settings)
}

fn batch(edits: &[([i32; 3], u8)]) -> StructureBatch {
    edits
        .iter()
        .map(|(pos, id)| VoxelModification::new(*pos, *id))
        .collect()
}

#[test]
fn test_modification_batches_apply_in_fifo_order() {
    let streamer = streamer_with(memory_settings());
    let store = streamer.store();

    let p1 = [100, 90, 100];
    let p2 = [101, 90, 100];
    let p3 = [102, 90, 100];
    store.enqueue_modifications(vec![batch(&[(p1, 5), (p2, 6)]), batch(&[(p3, 7)])]);

    let applied = streamer.apply_modifications();

    assert_eq!(applied, 2);
    assert_eq!(store.get_voxel(p1).unwrap().id, 5);
    assert_eq!(store.get_voxel(p2).unwrap().id, 6);
    assert_eq!(store.get_voxel(p3).unwrap().id, 7);
    assert_eq!(store.pending_modification_batches(), 0);
}

#[test]
fn test_later_batch_wins_on_overlap() {
    let streamer = streamer_with(memory_settings());
    let store = streamer.store();

    let pos = [200, 90, 200];
    store.enqueue_modifications(vec![batch(&[(pos, 5)]), batch(&[(pos, 7)])]);
    streamer.apply_modifications();

    // Batches never interleave; the second batch applies strictly after the
    // first, so its write is the survivor.
    assert_eq!(store.get_voxel(pos).unwrap().id, 7);
}

#[test]
fn test_applied_batch_schedules_touched_chunks() {
    let streamer = streamer_with(memory_settings());

    // A tree-shaped batch straddling the boundary between chunks (2, 2)
    // and (3, 2).
    let edits: Vec<([i32; 3], u8)> = (0..4)
        .map(|i| ([47 + i, 80, 40], 32u8))
        .collect();
    streamer.store().enqueue_modifications(vec![batch(&edits)]);
    streamer.apply_modifications();

    let updates = streamer.pending_updates();
    assert!(updates.contains(&ChunkCoord::new(2, 2)));
    assert!(updates.contains(&ChunkCoord::new(3, 2)));
}

#[test]
fn test_generated_structures_flow_through_the_queue() {
    // Negative thresholds make every surface column emit a structure batch.
    let biome = BiomeProfile {
        vegetation_zone_threshold: -0.1,
        vegetation_placement_threshold: -0.1,
        ..BiomeProfile::default()
    };
    let settings = Arc::new(WorldSettings {
        no_persistence: true,
        ..WorldSettings::default()
    });
    let store = Arc::new(
        ChunkStore::new(
            settings.clone(),
            Arc::new(biome),
            Arc::new(BlockCatalog::default()),
        )
        .unwrap(),
    );

    store.request_chunk(ChunkCoord::new(4, 4), true);
    assert!(store.pending_modification_batches() >= CHUNK_WIDTH * CHUNK_WIDTH);

    // Every batch is rooted on a surface voxel of the generated chunk and
    // writes only non-air ids.
    let first = store.pop_modification_batch().unwrap();
    assert!(first.iter().all(|m| m.id != 0));
}

#[test]
fn test_worker_drains_modifications() {
    let streamer = streamer_with(WorldSettings {
        threading: ThreadingMode::Worker,
        ..memory_settings()
    });

    streamer.start_worker();
    let pos = [150, 90, 150];
    streamer
        .store()
        .enqueue_modifications(vec![batch(&[(pos, 9)])]);

    // The worker loop picks the batch up on its own.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if streamer
            .store()
            .get_voxel(pos)
            .is_some_and(|v| v.id == 9)
        {
            break;
        }
        assert!(Instant::now() < deadline, "worker never applied the batch");
        std::thread::sleep(Duration::from_millis(5));
    }

    streamer.shutdown();
    assert!(!streamer.worker_running());
}

#[test]
fn test_deactivated_chunk_keeps_its_data() {
    let streamer = streamer_with(memory_settings());

    // Create and mesh one chunk inside the first window.
    for _ in 0..3 {
        streamer.tick([168.0, 64.0, 168.0]);
    }
    let created = ChunkCoord::new(6, 6);
    assert!(streamer.store().with_chunk(created, |_| ()).is_some());

    // Walk far away: the chunk deactivates but its data stays resident.
    streamer.tick([1000.0, 64.0, 1000.0]);
    assert_eq!(streamer.chunk_phase(created), ChunkPhase::Inactive);
    assert!(streamer.store().with_chunk(created, |_| ()).is_some());
}

#[test]
fn test_save_and_reopen_through_scheduler() {
    let dir = tempfile::TempDir::new().unwrap();
    let settings = WorldSettings {
        save_root: dir.path().to_path_buf(),
        seed: 4242,
        no_vegetation: true,
        ..WorldSettings::default()
    };

    let streamer = streamer_with(settings.clone());
    streamer.edit_voxel([100, 90, 100], 18);
    let saved = streamer.save_world().unwrap();
    assert!(saved >= 1);
    drop(streamer);

    let reopened = streamer_with(settings);
    assert_eq!(reopened.store().seed(), 4242);
    assert_eq!(reopened.store().get_voxel([100, 90, 100]).unwrap().id, 18);
}

#[test]
fn test_delete_world_save_resets_the_world() {
    let dir = tempfile::TempDir::new().unwrap();
    let settings = WorldSettings {
        save_root: dir.path().to_path_buf(),
        seed: 9,
        no_vegetation: true,
        ..WorldSettings::default()
    };

    let streamer = streamer_with(settings.clone());
    streamer.edit_voxel([100, 90, 100], 18);
    streamer.save_world().unwrap();
    streamer.delete_world_save().unwrap();
    drop(streamer);

    // With the save gone the edit regenerates away.
    let reopened = streamer_with(settings);
    let regenerated = reopened.store().get_voxel([100, 90, 100]).unwrap();
    assert_ne!(regenerated.id, 18);
}
