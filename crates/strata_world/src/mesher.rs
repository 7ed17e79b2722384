//! # Chunk Mesher
//!
//! Turns a chunk's voxel grid plus its neighbors into renderable geometry.
//!
//! ## Face Culling
//!
//! Every solid voxel tests all six faces; a face is emitted only when the
//! neighbor voxel - possibly in an adjacent chunk, resolved through the
//! store - exists and is transparent. Each visible face contributes four
//! vertices, one normal, and six indices routed to the opaque or transparent
//! submesh by the *emitting* voxel's transparency, not the neighbor's.
//!
//! ## Texture Atlas
//!
//! UVs come from the block's per-face atlas index: `u = index mod atlas`,
//! `v = index div atlas`, normalized and vertically flipped to match the
//! atlas row ordering.
//!
//! The mesher owns no scene objects; it fills per-chunk scratch buffers
//! ([`ChunkRuntime`]) and snapshots them into [`RenderableMesh`] values the
//! render collaborator consumes.

use strata_procedural::blocks::{
    normalized_block_texture_size, BlockCatalog, TEXTURE_ATLAS_SIZE_IN_BLOCKS,
};
use strata_procedural::chunk::{ChunkCoord, CHUNK_HEIGHT, CHUNK_WIDTH};

use crate::store::ChunkStore;

/// The eight cube corner positions.
pub const VOXEL_VERTS: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Neighbor offset per face, in Back/Front/Top/Bottom/Left/Right order.
pub const FACE_CHECKS: [[i32; 3]; 6] = [
    [0, 0, -1],
    [0, 0, 1],
    [0, 1, 0],
    [0, -1, 0],
    [-1, 0, 0],
    [1, 0, 0],
];

/// Corner-vertex lookup per face. The four corners unfold into two
/// triangles as `0 1 2, 2 1 3`.
pub const VOXEL_TRIS: [[usize; 4]; 6] = [
    [0, 3, 1, 2],
    [5, 6, 4, 7],
    [3, 7, 2, 6],
    [1, 5, 0, 4],
    [4, 7, 0, 3],
    [1, 2, 5, 6],
];

/// A finished mesh handout for the render collaborator.
///
/// Vertices are chunk-local; `anchor` is the chunk's world-space origin.
#[derive(Clone, Debug, Default)]
pub struct RenderableMesh {
    /// The chunk this mesh belongs to.
    pub coord: ChunkCoord,
    /// World-space origin of the chunk.
    pub anchor: [f32; 3],
    /// Chunk-local vertex positions, four per face.
    pub vertices: Vec<[f32; 3]>,
    /// Triangle indices of the opaque submesh.
    pub opaque_indices: Vec<u32>,
    /// Triangle indices of the transparent submesh.
    pub transparent_indices: Vec<u32>,
    /// Texture coordinates, one per vertex.
    pub uvs: Vec<[f32; 2]>,
    /// Face normals, one per face.
    pub normals: Vec<[f32; 3]>,
}

/// Per-chunk mesh scratch state.
///
/// A runtime is the disposable rendering-facing view of a chunk: it holds
/// the mesh-building buffers and the active flag, while the durable truth
/// stays in the store's [`strata_procedural::chunk::ChunkData`]. Rebuilding
/// clears every buffer first, so a runtime can be remeshed any number of
/// times.
#[derive(Debug)]
pub struct ChunkRuntime {
    /// The chunk this runtime views.
    pub coord: ChunkCoord,
    active: bool,
    vertex_index: u32,
    vertices: Vec<[f32; 3]>,
    opaque_indices: Vec<u32>,
    transparent_indices: Vec<u32>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

impl ChunkRuntime {
    /// Creates an empty, inactive runtime for a chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            active: false,
            vertex_index: 0,
            vertices: Vec::new(),
            opaque_indices: Vec::new(),
            transparent_indices: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
        }
    }

    /// Whether the chunk is inside the active view window.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Sets the visibility flag.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The chunk's world-space origin.
    #[must_use]
    pub fn anchor(&self) -> [f32; 3] {
        [
            self.coord.world_x() as f32,
            0.0,
            self.coord.world_z() as f32,
        ]
    }

    /// Number of emitted faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.normals.len()
    }

    /// Clears all scratch buffers ahead of a rebuild.
    pub fn clear(&mut self) {
        self.vertex_index = 0;
        self.vertices.clear();
        self.opaque_indices.clear();
        self.transparent_indices.clear();
        self.uvs.clear();
        self.normals.clear();
    }

    /// Snapshots the buffers into a handout for the render collaborator.
    #[must_use]
    pub fn to_renderable(&self) -> RenderableMesh {
        RenderableMesh {
            coord: self.coord,
            anchor: self.anchor(),
            vertices: self.vertices.clone(),
            opaque_indices: self.opaque_indices.clone(),
            transparent_indices: self.transparent_indices.clone(),
            uvs: self.uvs.clone(),
            normals: self.normals.clone(),
        }
    }

    /// Appends one face of a voxel at a local position.
    fn push_face(&mut self, catalog: &BlockCatalog, id: u8, local: [usize; 3], face: usize) {
        for corner in VOXEL_TRIS[face] {
            let vert = VOXEL_VERTS[corner];
            self.vertices.push([
                local[0] as f32 + vert[0],
                local[1] as f32 + vert[1],
                local[2] as f32 + vert[2],
            ]);
        }

        self.normals.push([
            FACE_CHECKS[face][0] as f32,
            FACE_CHECKS[face][1] as f32,
            FACE_CHECKS[face][2] as f32,
        ]);

        self.push_texture(catalog.texture_index(id, face));

        let vi = self.vertex_index;
        let indices = if catalog.is_transparent(id) {
            &mut self.transparent_indices
        } else {
            &mut self.opaque_indices
        };
        indices.extend_from_slice(&[vi, vi + 1, vi + 2, vi + 2, vi + 1, vi + 3]);
        self.vertex_index += 4;
    }

    /// Appends the four texture coordinates for an atlas tile, flipped
    /// vertically to match the atlas row ordering.
    fn push_texture(&mut self, texture_id: u16) {
        let tile = normalized_block_texture_size();
        let u = f32::from(texture_id % TEXTURE_ATLAS_SIZE_IN_BLOCKS) * tile;
        let v = f32::from(texture_id / TEXTURE_ATLAS_SIZE_IN_BLOCKS) * tile;
        let v = 1.0 - v - tile;

        self.uvs.push([u, v]);
        self.uvs.push([u, v + tile]);
        self.uvs.push([u + tile, v]);
        self.uvs.push([u + tile, v + tile]);
    }
}

/// Rebuilds a chunk's mesh buffers from the store.
///
/// Clears the runtime first, so the call is idempotent. A runtime whose
/// chunk is not resident produces an empty mesh.
pub fn build_chunk_mesh(store: &ChunkStore, runtime: &mut ChunkRuntime) {
    runtime.clear();

    let Some(chunk) = store.clone_chunk(runtime.coord) else {
        return;
    };
    let catalog = store.catalog();
    let world_x = runtime.coord.world_x();
    let world_z = runtime.coord.world_z();

    for y in 0..CHUNK_HEIGHT {
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                let id = chunk.voxel(x, y, z).id;
                if !catalog.is_solid(id) {
                    continue;
                }

                for face in 0..6 {
                    let nx = x as i32 + FACE_CHECKS[face][0];
                    let ny = y as i32 + FACE_CHECKS[face][1];
                    let nz = z as i32 + FACE_CHECKS[face][2];

                    let neighbor = if nx >= 0
                        && nx < CHUNK_WIDTH as i32
                        && ny >= 0
                        && ny < CHUNK_HEIGHT as i32
                        && nz >= 0
                        && nz < CHUNK_WIDTH as i32
                    {
                        Some(chunk.voxel(nx as usize, ny as usize, nz as usize))
                    } else {
                        store.get_voxel([world_x + nx, ny, world_z + nz])
                    };

                    if neighbor.is_some_and(|n| catalog.is_transparent(n.id)) {
                        runtime.push_face(catalog, id, [x, y, z], face);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldSettings;
    use std::sync::Arc;
    use strata_procedural::biome::BiomeProfile;
    use strata_procedural::blocks::BlockCatalog;

    /// A store whose terrain is a bedrock floor with air above.
    fn flat_store() -> ChunkStore {
        let biome = BiomeProfile {
            terrain_height: 0,
            solid_ground_height: 0,
            ..BiomeProfile::default()
        };
        ChunkStore::new(
            Arc::new(WorldSettings {
                no_persistence: true,
                no_vegetation: true,
                ..WorldSettings::default()
            }),
            Arc::new(biome),
            Arc::new(BlockCatalog::default()),
        )
        .unwrap()
    }

    /// A store whose terrain fills the entire world height.
    fn solid_store() -> ChunkStore {
        let biome = BiomeProfile {
            terrain_height: 0,
            solid_ground_height: 127,
            ..BiomeProfile::default()
        };
        ChunkStore::new(
            Arc::new(WorldSettings {
                no_persistence: true,
                no_vegetation: true,
                ..WorldSettings::default()
            }),
            Arc::new(biome),
            Arc::new(BlockCatalog::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_fully_enclosed_chunk_emits_no_faces() {
        let store = solid_store();
        store.request_chunk(ChunkCoord::new(2, 2), true);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(2, 2));
        build_chunk_mesh(&store, &mut runtime);

        assert_eq!(runtime.face_count(), 0);
        let mesh = runtime.to_renderable();
        assert!(mesh.vertices.is_empty());
        assert!(mesh.opaque_indices.is_empty());
        assert!(mesh.transparent_indices.is_empty());
    }

    #[test]
    fn test_isolated_voxel_adds_exactly_six_faces() {
        let store = flat_store();
        store.request_chunk(ChunkCoord::new(2, 2), true);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(2, 2));
        build_chunk_mesh(&store, &mut runtime);
        let base = runtime.to_renderable();

        store.set_voxel([40, 60, 40], 2);
        build_chunk_mesh(&store, &mut runtime);
        let edited = runtime.to_renderable();

        assert_eq!(edited.vertices.len(), base.vertices.len() + 24);
        assert_eq!(edited.normals.len(), base.normals.len() + 6);
        assert_eq!(
            edited.opaque_indices.len(),
            base.opaque_indices.len() + 36,
            "an isolated voxel is twelve opaque triangles"
        );
        assert_eq!(edited.uvs.len(), edited.vertices.len());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let store = flat_store();
        store.request_chunk(ChunkCoord::new(3, 3), true);
        store.set_voxel([56, 40, 56], 2);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(3, 3));
        build_chunk_mesh(&store, &mut runtime);
        let first = runtime.to_renderable();
        build_chunk_mesh(&store, &mut runtime);
        let second = runtime.to_renderable();

        assert_eq!(first.vertices, second.vertices);
        assert_eq!(first.opaque_indices, second.opaque_indices);
        assert_eq!(first.transparent_indices, second.transparent_indices);
        assert_eq!(first.uvs, second.uvs);
        assert_eq!(first.normals, second.normals);
    }

    #[test]
    fn test_transparent_voxel_routes_to_transparent_submesh() {
        let store = flat_store();
        store.request_chunk(ChunkCoord::new(2, 2), true);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(2, 2));
        build_chunk_mesh(&store, &mut runtime);
        let base = runtime.to_renderable();
        assert!(base.transparent_indices.is_empty());

        // Oak leaves are solid but transparent.
        store.set_voxel([40, 60, 40], 31);
        build_chunk_mesh(&store, &mut runtime);
        let edited = runtime.to_renderable();

        assert_eq!(edited.transparent_indices.len(), 36);
        assert_eq!(edited.opaque_indices.len(), base.opaque_indices.len());
    }

    #[test]
    fn test_missing_chunk_meshes_empty() {
        let store = flat_store();
        let mut runtime = ChunkRuntime::new(ChunkCoord::new(9, 9));

        build_chunk_mesh(&store, &mut runtime);
        assert_eq!(runtime.face_count(), 0);
    }

    #[test]
    fn test_atlas_uv_lookup_flips_rows() {
        let store = flat_store();
        store.request_chunk(ChunkCoord::new(2, 2), true);
        store.set_voxel([40, 60, 40], 2);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(2, 2));
        build_chunk_mesh(&store, &mut runtime);
        let mesh = runtime.to_renderable();

        // Stone maps every face to atlas tile 0: column 0, top row once
        // flipped, so v spans [1 - tile, 1].
        let tile = normalized_block_texture_size();
        let last_quad = &mesh.uvs[mesh.uvs.len() - 4..];
        assert_eq!(last_quad[0], [0.0, 1.0 - tile]);
        assert_eq!(last_quad[1], [0.0, 1.0]);
        assert_eq!(last_quad[2], [tile, 1.0 - tile]);
        assert_eq!(last_quad[3], [tile, 1.0]);
    }

    #[test]
    fn test_world_edge_emits_no_face() {
        // The voxel at the world floor has no out-of-world bottom face.
        let store = flat_store();
        store.request_chunk(ChunkCoord::new(0, 0), true);

        let mut runtime = ChunkRuntime::new(ChunkCoord::new(0, 0));
        build_chunk_mesh(&store, &mut runtime);

        // The bedrock floor shows only its top: one face per column.
        assert_eq!(runtime.face_count(), CHUNK_WIDTH * CHUNK_WIDTH);
        let mesh = runtime.to_renderable();
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }
}
