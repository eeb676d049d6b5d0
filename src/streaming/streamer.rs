//! Chunk streamer: keeps the chunks around the viewer meshed at the right LOD
//!
//! All chunk state lives on the thread that calls [`ChunkStreamer::update`].
//! Height data and mesh builds are requested through the provider traits and
//! come back as [`Completion`]s that are applied in `process_completions`.

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::{Error, Result, StreamerConfig};
use crate::mesh::{HeightSampleGrid, MeshData};
use crate::streaming::chunk::{ChunkCoord, ChunkRefresh, RefreshContext, TerrainChunk};
use crate::streaming::lod_cache::SlotUpdate;
use crate::streaming::provider::{
    Completion, CompletionSender, HeightMapProvider, HeightRequest, MeshBuildService,
    completion_channel,
};
use crate::streaming::viewer::ViewerState;

/// Streaming counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Full active-set recomputations
    pub recomputations: u64,
    pub height_requests: u64,
    pub mesh_requests: u64,
    pub meshes_built: u64,
    pub build_failures: u64,
    /// Results that arrived for chunks no longer visible at that LOD
    pub stale_results: u64,
    /// Results for slots or chunks that were not waiting on them
    pub duplicate_results: u64,
    /// Height grids of the wrong size, dropped on arrival
    pub rejected_grids: u64,
}

/// Owns every chunk and decides which ones are visible at which LOD.
pub struct ChunkStreamer {
    config: StreamerConfig,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    /// Chunks made visible by the last recompute
    active: HashSet<ChunkCoord>,
    viewer: ViewerState,
    height_provider: Box<dyn HeightMapProvider>,
    mesh_service: Box<dyn MeshBuildService>,
    reply: CompletionSender,
    completions: UnboundedReceiver<Completion>,
    stats: StreamingStats,
}

impl ChunkStreamer {
    /// Create a streamer. Fails if `config` does not validate.
    pub fn new(
        config: StreamerConfig,
        height_provider: impl HeightMapProvider + 'static,
        mesh_service: impl MeshBuildService + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let (reply, completions) = completion_channel();
        let viewer = ViewerState::new(&config);
        log::info!(
            "Chunk streamer: chunk size {}, {} LOD bands, view distance {}, radius {}",
            config.chunk_size(),
            config.lod_bands.len(),
            config.max_view_distance(),
            config.chunk_radius()
        );

        Ok(Self {
            config,
            chunks: HashMap::new(),
            active: HashSet::new(),
            viewer,
            height_provider: Box::new(height_provider),
            mesh_service: Box::new(mesh_service),
            reply,
            completions,
            stats: StreamingStats::default(),
        })
    }

    /// Per-frame entry point: apply finished work, then move the viewer.
    ///
    /// Returns `true` if the active set was recomputed.
    pub fn update(&mut self, viewer_world: Vec2) -> bool {
        self.process_completions();
        self.update_viewer(viewer_world)
    }

    /// [`update`](Self::update) from a 3D world position; height is ignored
    pub fn update_3d(&mut self, viewer_world: Vec3) -> bool {
        self.update(Vec2::new(viewer_world.x, viewer_world.z))
    }

    /// Move the viewer and recompute if it travelled past the threshold
    pub fn update_viewer(&mut self, viewer_world: Vec2) -> bool {
        self.viewer.set_world_position(viewer_world);
        if !self.viewer.needs_update() {
            return false;
        }
        self.viewer.mark_updated();
        self.recompute();
        true
    }

    /// Rebuild the active set around the current viewer position
    pub fn recompute(&mut self) {
        for coord in self.active.drain() {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                chunk.set_visible(false);
            }
        }

        let center = self.viewer_chunk_coord();
        let radius = self.config.chunk_radius();
        let mut created = 0;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let Some(coord) = center.offset(dx, dy) else {
                    continue;
                };
                if self.chunks.contains_key(&coord) {
                    self.refresh_chunk(coord);
                } else {
                    self.create_chunk(coord);
                    created += 1;
                }
            }
        }

        self.stats.recomputations += 1;
        log::info!(
            "Recomputed around chunk {}: {} visible, {} new, {} total",
            center,
            self.active.len(),
            created,
            self.chunks.len()
        );
    }

    /// Apply every completion delivered so far. Returns how many were handled.
    pub fn process_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completions.try_recv() {
            match completion {
                Completion::HeightData { coord, grid } => self.apply_height_data(coord, grid),
                Completion::Mesh { coord, lod_index, result } => self.apply_mesh(coord, lod_index, result),
            }
            handled += 1;
        }
        handled
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let chunk = TerrainChunk::new(coord, &self.config);
        let request = HeightRequest {
            coord,
            center: chunk.position(),
            bordered_size: self.config.bordered_size(),
        };
        self.chunks.insert(coord, chunk);

        log::debug!("Requesting height data for chunk {}", coord);
        self.height_provider.request_height_data(request, self.reply.clone());
        self.stats.height_requests += 1;
    }

    fn refresh_chunk(&mut self, coord: ChunkCoord) -> Option<ChunkRefresh> {
        let ctx = RefreshContext {
            bands: &self.config.lod_bands,
            collider_band: self.config.collider_band(),
            mesh_service: &*self.mesh_service,
            reply: &self.reply,
        };
        let chunk = self.chunks.get_mut(&coord)?;
        let outcome = chunk.refresh(self.viewer.position(), &ctx);

        self.stats.mesh_requests += outcome.mesh_requests as u64;
        if outcome.visible {
            self.active.insert(coord);
        } else {
            self.active.remove(&coord);
        }
        Some(outcome)
    }

    fn apply_height_data(&mut self, coord: ChunkCoord, grid: HeightSampleGrid) {
        let expected = self.config.bordered_size();
        if grid.bordered_size() != expected {
            log::warn!(
                "Height grid for chunk {} is {} samples wide, expected {}, dropping",
                coord,
                grid.bordered_size(),
                expected
            );
            self.stats.rejected_grids += 1;
            return;
        }

        let Some(chunk) = self.chunks.get_mut(&coord) else {
            log::warn!("Height data for unknown chunk {}", coord);
            self.stats.duplicate_results += 1;
            return;
        };
        if !chunk.receive_height_data(grid) {
            log::warn!("Chunk {} already has height data, ignoring", coord);
            self.stats.duplicate_results += 1;
            return;
        }

        log::debug!("Height data received for chunk {}", coord);
        if let Some(outcome) = self.refresh_chunk(coord) {
            if !outcome.visible {
                log::debug!("Height data for chunk {} arrived out of view", coord);
                self.stats.stale_results += 1;
            }
        }
    }

    fn apply_mesh(&mut self, coord: ChunkCoord, lod_index: usize, result: Result<MeshData>) {
        let collider_band = self.config.collider_band();
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            log::warn!("Mesh for unknown chunk {}", coord);
            self.stats.duplicate_results += 1;
            return;
        };

        let wanted = chunk.is_visible()
            && (chunk.current_band() == Some(lod_index) || collider_band == Some(lod_index));

        match chunk.meshes_mut().complete(lod_index, result) {
            Ok(SlotUpdate::Ready) => self.stats.meshes_built += 1,
            Ok(SlotUpdate::Failed) => {
                self.stats.build_failures += 1;
                return;
            }
            Err(e @ Error::DuplicateRequest { .. }) => {
                log::warn!("{}, ignoring result", e);
                self.stats.duplicate_results += 1;
                return;
            }
            Err(e) => {
                log::warn!("Dropping mesh for chunk {}: {}", coord, e);
                return;
            }
        }

        if !wanted {
            // Cached anyway; it is reused if the chunk comes back into this band
            log::debug!("Mesh for chunk {} slot {} arrived while not needed", coord, lod_index);
            self.stats.stale_results += 1;
        }
        self.refresh_chunk(coord);
    }

    /// Handle for injecting completions from outside the built-in providers
    pub fn completion_sender(&self) -> CompletionSender {
        self.reply.clone()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Chunks the renderer should draw
    pub fn visible_chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values().filter(|c| c.is_visible())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn active_chunks(&self) -> &HashSet<ChunkCoord> {
        &self.active
    }

    pub fn visible_chunk_count(&self) -> usize {
        self.visible_chunks().count()
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    /// Chunk nearest to the viewer
    pub fn viewer_chunk_coord(&self) -> ChunkCoord {
        ChunkCoord::nearest(self.viewer.position(), self.config.chunk_size())
    }

    pub fn chunk_radius(&self) -> i32 {
        self.config.chunk_radius()
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamingStats {
        self.stats
    }
}
