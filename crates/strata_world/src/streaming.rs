//! # Chunk Streaming
//!
//! Keeps a bounded working set of chunks alive around a moving observer and
//! runs the create/update/draw pipeline over it.
//!
//! ## Per-coordinate state machine
//!
//! ```text
//! absent -> queued-for-creation -> created-inactive -> active
//!                                        ^                |
//!                                        +--- leaves view +
//! ```
//!
//! Chunk data is never destroyed once created; leaving the view only idles
//! the chunk's runtime.
//!
//! ## Scheduling
//!
//! Per tick: at most one queued creation (FIFO), at most one queued draw
//! (FIFO), and - when not already mid-apply - the entire modification queue
//! followed by one update-list entry. Voxel edits insert the edited chunk
//! and its cross-boundary neighbors at the *front* of the update list, ahead
//! of generation-triggered updates.
//!
//! ## Locking
//!
//! Scheduler state (the update list, the queues, the runtimes) forms the
//! second of the two exclusive lock domains; the chunk map inside the store
//! is the first. Updates run under the scheduler lock, so two updates of the
//! same chunk can never interleave. The scheduler lock may be held while
//! taking the chunk-map lock, never the other way around.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use strata_procedural::chunk::{
    is_chunk_in_world, ChunkCoord, CHUNK_HEIGHT, CHUNK_WIDTH, WORLD_SIZE_IN_CHUNKS,
};

use crate::config::{ThreadingMode, WorldSettings};
use crate::mesher::{build_chunk_mesh, ChunkRuntime, RenderableMesh, FACE_CHECKS};
use crate::persistence::PersistenceError;
use crate::store::ChunkStore;

/// How long shutdown waits for the worker's done-signal before detaching.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The lifecycle phase of a chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkPhase {
    /// Never requested.
    Absent,
    /// Waiting in the creation queue.
    Queued,
    /// Created, currently outside the view window.
    Inactive,
    /// Created and inside the view window.
    Active,
}

/// Scheduler state, guarded by the update-list lock domain.
struct StreamState {
    /// Per-chunk mesh runtimes.
    runtimes: HashMap<ChunkCoord, ChunkRuntime>,
    /// Chunks waiting to be created, drained FIFO one per tick.
    create_queue: VecDeque<ChunkCoord>,
    /// Chunks waiting for a mesh rebuild. Voxel edits insert at the front.
    update_list: VecDeque<ChunkCoord>,
    /// Freshly meshed chunks waiting for a draw handout, drained FIFO.
    draw_queue: VecDeque<ChunkCoord>,
    /// Coordinates inside the current view window.
    active: HashSet<ChunkCoord>,
    /// The observer's chunk coordinate at the last window refresh.
    observer: ChunkCoord,
    /// False until the first tick fixes the initial window.
    observer_known: bool,
}

/// A running background worker and its completion signal.
struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// The streaming scheduler.
pub struct ChunkStreamer {
    store: Arc<ChunkStore>,
    settings: Arc<WorldSettings>,
    state: Mutex<StreamState>,
    /// Guards against re-entering the modification drain.
    applying: AtomicBool,
    /// Cooperative stop flag, checked once per worker iteration.
    stop: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl ChunkStreamer {
    /// Creates a scheduler over a chunk store.
    #[must_use]
    pub fn new(store: Arc<ChunkStore>, settings: Arc<WorldSettings>) -> Arc<Self> {
        Arc::new(Self {
            store,
            settings,
            state: Mutex::new(StreamState {
                runtimes: HashMap::new(),
                create_queue: VecDeque::new(),
                update_list: VecDeque::new(),
                draw_queue: VecDeque::new(),
                active: HashSet::new(),
                observer: ChunkCoord::default(),
                observer_known: false,
            }),
            applying: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    /// The store this scheduler streams from.
    #[must_use]
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// The world-center spawn position.
    #[must_use]
    pub fn spawn_position(&self) -> [f32; 3] {
        let center = (WORLD_SIZE_IN_CHUNKS * CHUNK_WIDTH as i32) as f32 * 0.5;
        [center, CHUNK_HEIGHT as f32, center]
    }

    /// Runs the startup sequence: preloads chunks around the spawn at load
    /// distance, fixes the initial view window, and - in worker mode -
    /// starts the background worker.
    pub fn initialize(self: &Arc<Self>) {
        let spawn = self.spawn_position();
        let center = ChunkCoord::from_world(spawn[0] as i32, spawn[2] as i32);

        info!(x = center.x, z = center.z, "initializing world around spawn");
        self.store
            .preload(center, self.settings.load_distance_in_chunks);

        {
            let mut state = self.state.lock();
            state.observer = center;
            state.observer_known = true;
            self.refresh_view_locked(&mut state, center);
        }

        if self.settings.threading == ThreadingMode::Worker {
            self.start_worker();
        }
    }

    /// Advances the pipeline one tick for the given observer position.
    ///
    /// Refreshes the view window when the observer crossed a chunk border,
    /// drains at most one creation and one draw, and - in single-threaded
    /// mode - applies pending modifications and one chunk update inline.
    ///
    /// Returns a mesh handout when a freshly meshed chunk was drawn.
    pub fn tick(&self, observer: [f32; 3]) -> Option<RenderableMesh> {
        let observer_chunk =
            ChunkCoord::from_world(observer[0].floor() as i32, observer[2].floor() as i32);

        let mesh = {
            let mut state = self.state.lock();

            if !state.observer_known || state.observer != observer_chunk {
                state.observer = observer_chunk;
                state.observer_known = true;
                self.refresh_view_locked(&mut state, observer_chunk);
            }

            if let Some(coord) = state.create_queue.pop_front() {
                self.store.request_chunk(coord, true);
                if !state.update_list.contains(&coord) {
                    state.update_list.push_back(coord);
                }
            }

            state
                .draw_queue
                .pop_front()
                .and_then(|coord| state.runtimes.get(&coord).map(ChunkRuntime::to_renderable))
        };

        if self.settings.threading == ThreadingMode::Single {
            self.apply_modifications();
            self.update_one_chunk();
        }

        mesh
    }

    /// Writes a voxel and schedules re-meshing of the edited chunk - and of
    /// every neighbor whose shared face lies across the chunk boundary - at
    /// the front of the update list.
    pub fn edit_voxel(&self, pos: [i32; 3], id: u8) {
        let Some(coord) = self.store.set_voxel(pos, id) else {
            return;
        };

        let mut state = self.state.lock();
        Self::schedule_front(&mut state.update_list, coord);

        for offset in FACE_CHECKS {
            let neighbor = ChunkCoord::from_world(pos[0] + offset[0], pos[2] + offset[2]);
            if neighbor != coord && is_chunk_in_world(neighbor) {
                Self::schedule_front(&mut state.update_list, neighbor);
            }
        }
    }

    /// Drains the entire modification queue, scheduling an update for every
    /// chunk a batch touched. Re-entry is guarded, so overlapping callers
    /// skip instead of interleaving batches.
    ///
    /// Returns the number of batches applied.
    pub fn apply_modifications(&self) -> usize {
        if self.applying.swap(true, Ordering::Acquire) {
            return 0;
        }

        let mut applied = 0;
        while let Some(batch) = self.store.pop_modification_batch() {
            let mut touched: Vec<ChunkCoord> = Vec::new();
            for modification in batch {
                if let Some(coord) = self.store.set_voxel(modification.position, modification.id) {
                    if !touched.contains(&coord) {
                        touched.push(coord);
                    }
                }
            }

            let mut state = self.state.lock();
            for coord in touched {
                if !state.update_list.contains(&coord) {
                    state.update_list.push_back(coord);
                }
            }
            applied += 1;
        }

        self.applying.store(false, Ordering::Release);
        applied
    }

    /// Rebuilds the mesh of the chunk at the front of the update list.
    ///
    /// Runs entirely under the scheduler lock: an update never runs
    /// concurrently with another update of the same chunk.
    ///
    /// Returns whether an update was processed.
    pub fn update_one_chunk(&self) -> bool {
        let mut state = self.state.lock();
        let Some(coord) = state.update_list.pop_front() else {
            return false;
        };

        let runtime = state
            .runtimes
            .entry(coord)
            .or_insert_with(|| ChunkRuntime::new(coord));
        build_chunk_mesh(&self.store, runtime);
        runtime.set_active(true);

        state.active.insert(coord);
        state.draw_queue.push_back(coord);
        debug!(x = coord.x, z = coord.z, "chunk remeshed");
        true
    }

    /// Starts the background update worker. Idempotent while one is running.
    pub fn start_worker(self: &Arc<Self>) {
        let mut guard = self.worker.lock();
        if guard.is_some() {
            return;
        }

        self.stop.store(false, Ordering::Release);
        let (done_tx, done_rx) = bounded(1);
        let streamer = Arc::clone(self);

        let spawned = std::thread::Builder::new()
            .name("chunk-update".to_owned())
            .spawn(move || {
                info!("chunk update worker started");
                while !streamer.stop.load(Ordering::Acquire) {
                    let applied = streamer.apply_modifications();
                    let updated = streamer.update_one_chunk();
                    if applied == 0 && !updated {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
                info!("chunk update worker stopped");
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                *guard = Some(Worker {
                    handle,
                    done: done_rx,
                });
            }
            Err(e) => error!(error = %e, "failed to spawn chunk update worker"),
        }
    }

    /// Signals the worker to stop and waits for it with a bounded join.
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        match worker.done.recv_timeout(WORKER_JOIN_TIMEOUT) {
            Ok(()) => {
                let _ = worker.handle.join();
            }
            Err(_) => warn!("chunk update worker missed the join deadline, detaching"),
        }
    }

    /// Whether the background worker is currently running.
    #[must_use]
    pub fn worker_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// The lifecycle phase of a chunk coordinate.
    #[must_use]
    pub fn chunk_phase(&self, coord: ChunkCoord) -> ChunkPhase {
        let state = self.state.lock();
        if state.create_queue.contains(&coord) {
            ChunkPhase::Queued
        } else if !state.runtimes.contains_key(&coord) {
            ChunkPhase::Absent
        } else if state.active.contains(&coord) {
            ChunkPhase::Active
        } else {
            ChunkPhase::Inactive
        }
    }

    /// The coordinates inside the current view window.
    #[must_use]
    pub fn active_chunks(&self) -> Vec<ChunkCoord> {
        self.state.lock().active.iter().copied().collect()
    }

    /// The update list, front first.
    #[must_use]
    pub fn pending_updates(&self) -> Vec<ChunkCoord> {
        self.state.lock().update_list.iter().copied().collect()
    }

    /// Number of chunks waiting in the creation queue.
    #[must_use]
    pub fn queued_creations(&self) -> usize {
        self.state.lock().create_queue.len()
    }

    /// Saves the world metadata and all modified chunks.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when a write fails.
    pub fn save_world(&self) -> Result<usize, PersistenceError> {
        self.store.save_world()
    }

    /// Deletes this world's save directory.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when the directory cannot be removed.
    pub fn delete_world_save(&self) -> Result<(), PersistenceError> {
        self.store.delete_world_save()
    }

    /// Recomputes the inclusive square view window around `center`.
    ///
    /// Inside and absent queues for creation; inside and idle reactivates;
    /// previously active outside the window deactivates. Chunk data is
    /// retained either way.
    fn refresh_view_locked(&self, state: &mut StreamState, center: ChunkCoord) {
        let view = self.settings.view_distance_in_chunks;
        let mut window = HashSet::new();

        for x in (center.x - view)..=(center.x + view) {
            for z in (center.z - view)..=(center.z + view) {
                let coord = ChunkCoord::new(x, z);
                if !is_chunk_in_world(coord) {
                    continue;
                }

                if let Some(runtime) = state.runtimes.get_mut(&coord) {
                    runtime.set_active(true);
                } else {
                    state.runtimes.insert(coord, ChunkRuntime::new(coord));
                    state.create_queue.push_back(coord);
                }
                window.insert(coord);
            }
        }

        for coord in state.active.difference(&window) {
            if let Some(runtime) = state.runtimes.get_mut(coord) {
                runtime.set_active(false);
            }
        }

        // A creation queued for a coordinate that left the window before it
        // ran is cancelled; the coordinate drops back to absent.
        let stale: Vec<ChunkCoord> = state
            .create_queue
            .iter()
            .filter(|coord| !window.contains(*coord))
            .copied()
            .collect();
        for coord in &stale {
            state.runtimes.remove(coord);
        }
        state.create_queue.retain(|coord| window.contains(coord));

        debug!(
            x = center.x,
            z = center.z,
            active = window.len(),
            "view window refreshed"
        );
        state.active = window;
    }

    /// Moves a coordinate to the front of the update list.
    fn schedule_front(update_list: &mut VecDeque<ChunkCoord>, coord: ChunkCoord) {
        if let Some(existing) = update_list.iter().position(|c| *c == coord) {
            update_list.remove(existing);
        }
        update_list.push_front(coord);
    }
}

impl Drop for ChunkStreamer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
