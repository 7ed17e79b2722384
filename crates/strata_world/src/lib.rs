//! # Strata World Runtime
//!
//! The runtime half of the Strata voxel engine: a locked sparse chunk store
//! with lazy load-or-generate semantics, versioned chunk persistence, a
//! face-culling mesh builder, and the observer-driven streaming pipeline
//! that keeps a bounded chunk working set alive.
//!
//! ## Architecture
//!
//! Everything is explicit dependency injection: a [`config::WorldSettings`]
//! plus a biome profile and block catalog construct a [`store::ChunkStore`],
//! and the store plus the catalog construct a [`streaming::ChunkStreamer`].
//! There are no globals.
//!
//! Shared state is guarded by exactly two lock domains: the chunk map
//! (inside the store) and the scheduler state around the update list
//! (inside the streamer). Mesh scratch buffers and voxel grids are owned by
//! exactly one chunk and never shared across chunks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_procedural::{BiomeProfile, BlockCatalog};
//! use strata_world::config::WorldSettings;
//! use strata_world::store::ChunkStore;
//! use strata_world::streaming::ChunkStreamer;
//!
//! let settings = Arc::new(WorldSettings::default());
//! let store = Arc::new(
//!     ChunkStore::new(
//!         settings.clone(),
//!         Arc::new(BiomeProfile::default()),
//!         Arc::new(BlockCatalog::default()),
//!     )
//!     .expect("world metadata"),
//! );
//! let streamer = ChunkStreamer::new(store, settings);
//!
//! streamer.initialize();
//! let observer = streamer.spawn_position();
//! if let Some(mesh) = streamer.tick(observer) {
//!     // hand the buffers to the render collaborator
//!     let _ = (&mesh.vertices, &mesh.opaque_indices, &mesh.transparent_indices);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod mesher;
pub mod persistence;
pub mod store;
pub mod streaming;

pub use config::{ConfigError, ThreadingMode, WorldSettings};
pub use mesher::{ChunkRuntime, RenderableMesh};
pub use persistence::{PersistenceError, WorldMeta};
pub use store::ChunkStore;
pub use streaming::{ChunkPhase, ChunkStreamer};
