//! Terrain chunks and their grid coordinates

use std::fmt;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::core::config::{LodBand, StreamerConfig};
use crate::math::Aabb;
use crate::mesh::{HeightSampleGrid, MeshData};
use crate::streaming::lod::{LodDecision, evaluate_bands};
use crate::streaming::lod_cache::LodMeshCache;
use crate::streaming::provider::{CompletionSender, MeshBuildService};

/// Integer coordinate identifying a chunk on the terrain plane.
///
/// `y` runs along world Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Nearest chunk to a chunk-space position (rounded, not floored:
    /// chunks are centred on their coordinate)
    pub fn nearest(pos: Vec2, chunk_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_size).round() as i32,
            y: (pos.y / chunk_size).round() as i32,
        }
    }

    /// Chunk centre in chunk space
    pub fn center(&self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * chunk_size
    }

    /// Neighbour at `(dx, dy)`, or `None` past the edge of the coordinate range
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Lifecycle state of a chunk, derived from its data and last refresh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Height data requested, not yet received
    Pending,
    /// Data received, outside the view distance
    Hidden,
    /// Inside LOD band `band`
    Visible { band: usize },
}

/// Everything a chunk needs from its owner to refresh itself
pub struct RefreshContext<'a> {
    pub bands: &'a [LodBand],
    pub collider_band: Option<usize>,
    pub mesh_service: &'a dyn MeshBuildService,
    pub reply: &'a CompletionSender,
}

/// Result of one chunk refresh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkRefresh {
    pub visible: bool,
    /// Mesh builds started by this refresh
    pub mesh_requests: usize,
}

/// One square region of terrain
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    /// Centre in chunk space
    position: Vec2,
    bounds: Aabb,
    world_scale: f32,
    visible: bool,
    grid: Option<Arc<HeightSampleGrid>>,
    /// Band the last refresh selected
    current_band: Option<usize>,
    /// Band whose mesh is currently shown
    displayed_band: Option<usize>,
    meshes: LodMeshCache,
    collider: Option<Arc<MeshData>>,
}

impl TerrainChunk {
    /// Create a hidden chunk waiting for height data
    pub fn new(coord: ChunkCoord, config: &StreamerConfig) -> Self {
        let chunk_size = config.chunk_size();
        let position = coord.center(chunk_size);
        Self {
            coord,
            position,
            bounds: Aabb::from_center_size(position, Vec2::splat(chunk_size)),
            world_scale: config.world_scale,
            visible: false,
            grid: None,
            current_band: None,
            displayed_band: None,
            meshes: LodMeshCache::new(coord, &config.lod_bands),
            collider: None,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Centre in chunk space
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Centre in world space
    pub fn world_position(&self) -> Vec3 {
        Vec3::new(self.position.x, 0.0, self.position.y) * self.world_scale
    }

    /// Uniform scale for this chunk's meshes
    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    pub fn state(&self) -> ChunkState {
        match (&self.grid, self.visible, self.current_band) {
            (None, _, _) => ChunkState::Pending,
            (Some(_), true, Some(band)) => ChunkState::Visible { band },
            _ => ChunkState::Hidden,
        }
    }

    pub fn has_height_data(&self) -> bool {
        self.grid.is_some()
    }

    pub fn height_data(&self) -> Option<&Arc<HeightSampleGrid>> {
        self.grid.as_ref()
    }

    /// Store the chunk's height grid. Returns `false` (and keeps the first
    /// grid) if data already arrived.
    pub fn receive_height_data(&mut self, grid: HeightSampleGrid) -> bool {
        if self.grid.is_some() {
            return false;
        }
        self.grid = Some(Arc::new(grid));
        true
    }

    pub fn meshes(&self) -> &LodMeshCache {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut LodMeshCache {
        &mut self.meshes
    }

    pub fn current_band(&self) -> Option<usize> {
        self.current_band
    }

    pub fn displayed_band(&self) -> Option<usize> {
        self.displayed_band
    }

    /// Mesh the renderer should draw
    pub fn current_display_mesh(&self) -> Option<&Arc<MeshData>> {
        self.displayed_band.and_then(|band| self.meshes.mesh(band))
    }

    /// Mesh the physics collider should use
    pub fn current_collider_mesh(&self) -> Option<&Arc<MeshData>> {
        self.collider.as_ref()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Distance from `viewer` to the chunk bounds (zero inside)
    pub fn distance_to(&self, viewer: Vec2) -> f32 {
        self.bounds.distance(viewer)
    }

    /// Re-evaluate LOD and visibility for a viewer at `viewer` (chunk space).
    ///
    /// Does nothing until height data has arrived. A band change only swaps
    /// the displayed mesh once the new band's mesh is ready; until then the
    /// previous mesh stays up.
    pub fn refresh(&mut self, viewer: Vec2, ctx: &RefreshContext<'_>) -> ChunkRefresh {
        let Some(grid) = self.grid.clone() else {
            return ChunkRefresh::default();
        };

        let mut outcome = ChunkRefresh::default();
        let distance = self.distance_to(viewer);
        let decision = evaluate_bands(ctx.bands, distance);

        if let LodDecision::Visible { band } = decision {
            self.current_band = Some(band);

            if self.displayed_band != Some(band) {
                if self.meshes.mesh(band).is_some() {
                    log::trace!("Chunk {} now showing band {}", self.coord, band);
                    self.displayed_band = Some(band);
                } else {
                    outcome.mesh_requests += self.ensure_mesh(band, &grid, ctx);
                }
            }

            if band == 0 {
                if let Some(collider_band) = ctx.collider_band {
                    match self.meshes.mesh(collider_band) {
                        Some(mesh) => self.collider = Some(Arc::clone(mesh)),
                        None => outcome.mesh_requests += self.ensure_mesh(collider_band, &grid, ctx),
                    }
                }
            }
        }

        outcome.visible = decision.is_visible();
        self.set_visible(outcome.visible);
        log::trace!(
            "Chunk {} refreshed: distance {:.1}, {:?}",
            self.coord, distance, decision
        );
        outcome
    }

    fn ensure_mesh(&mut self, band: usize, grid: &Arc<HeightSampleGrid>, ctx: &RefreshContext<'_>) -> usize {
        match self.meshes.ensure(band, grid, ctx.mesh_service, ctx.reply) {
            Ok(started) => usize::from(started),
            Err(e) => {
                log::warn!("Chunk {}: could not request band {}: {}", self.coord, band, e);
                0
            }
        }
    }
}
