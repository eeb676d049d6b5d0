//! Streamer configuration
//!
//! Loaded from / saved to pretty JSON. Every loaded config is validated so a
//! bad LOD table fails at startup rather than on the first mesh build.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use crate::mesh::MeshSettings;
use crate::core::{Error, Result};
use crate::mesh::{LodLevel, MeshLayout};

/// Largest chunk radius a config may ask for; each recompute walks
/// `(2r + 1)^2` coordinates
pub const MAX_CHUNK_RADIUS: i32 = 64;

/// One entry of the LOD distance table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodBand {
    /// Mesh LOD shown inside this band
    pub lod: LodLevel,
    /// Upper bound of the band, distance from the viewer to the chunk bounds
    pub max_distance: f32,
    /// Whether this band's mesh also feeds the physics collider
    #[serde(default)]
    pub use_for_collider: bool,
}

impl LodBand {
    pub fn new(lod: u32, max_distance: f32) -> Self {
        Self { lod: LodLevel(lod), max_distance, use_for_collider: false }
    }

    pub fn collider(mut self) -> Self {
        self.use_for_collider = true;
        self
    }
}

/// Configuration for a [`ChunkStreamer`](crate::streaming::ChunkStreamer)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Height samples per chunk side, border excluded
    pub chunk_sample_size: u32,
    /// Uniform scale from chunk space to world space
    pub world_scale: f32,
    /// Viewer displacement (chunk space) that triggers a recompute
    pub viewer_move_threshold: f32,
    /// Ascending LOD distance table; the last entry bounds visibility
    pub lod_bands: Vec<LodBand>,
    /// Height scaling used by mesh builds
    pub mesh: MeshSettings,
    /// Concurrent jobs allowed on the worker pool
    pub worker_threads: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            // 241 bordered samples: 240 is divisible by strides 1..=12
            chunk_sample_size: 239,
            world_scale: 2.5,
            viewer_move_threshold: 25.0,
            lod_bands: vec![
                LodBand::new(0, 200.0).collider(),
                LodBand::new(2, 400.0),
                LodBand::new(4, 600.0),
            ],
            mesh: MeshSettings::default(),
            worker_threads: 4,
        }
    }
}

impl StreamerConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::debug!("Loaded streamer config from {}", path.display());
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check the config for values the streamer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if self.chunk_sample_size < 2 {
            return invalid(format!("chunk_sample_size must be at least 2, got {}", self.chunk_sample_size));
        }
        if !(self.world_scale.is_finite() && self.world_scale > 0.0) {
            return invalid(format!("world_scale must be positive, got {}", self.world_scale));
        }
        if !(self.viewer_move_threshold.is_finite() && self.viewer_move_threshold >= 0.0) {
            return invalid(format!(
                "viewer_move_threshold must be non-negative, got {}",
                self.viewer_move_threshold
            ));
        }
        if self.worker_threads == 0 {
            return invalid("worker_threads must be at least 1".to_string());
        }
        if !self.mesh.height_scale.is_finite() {
            return invalid("mesh.height_scale must be finite".to_string());
        }
        if self.lod_bands.is_empty() {
            return invalid("lod_bands must not be empty".to_string());
        }

        let mut previous = 0.0;
        for (i, band) in self.lod_bands.iter().enumerate() {
            if !(band.max_distance.is_finite() && band.max_distance > previous) {
                return invalid(format!(
                    "lod_bands[{i}].max_distance {} must be finite and greater than {previous}",
                    band.max_distance
                ));
            }
            previous = band.max_distance;
            MeshLayout::new(self.bordered_size(), band.lod)?;
        }

        let radius = (self.max_view_distance() / self.chunk_size()).round();
        if !(radius <= MAX_CHUNK_RADIUS as f32) {
            return invalid(format!(
                "view distance {} spans {radius} chunks, at most {MAX_CHUNK_RADIUS} allowed",
                self.max_view_distance()
            ));
        }

        let colliders = self.lod_bands.iter().filter(|b| b.use_for_collider).count();
        if colliders > 1 {
            return invalid(format!("at most one collider band allowed, found {colliders}"));
        }

        Ok(())
    }

    /// Chunk side length in chunk-space units
    pub fn chunk_size(&self) -> f32 {
        (self.chunk_sample_size - 1) as f32
    }

    /// Height grid side length including the border ring
    pub fn bordered_size(&self) -> usize {
        self.chunk_sample_size as usize + 2
    }

    /// Farthest distance at which chunks stay visible
    pub fn max_view_distance(&self) -> f32 {
        self.lod_bands.last().map_or(0.0, |b| b.max_distance)
    }

    /// Chunks considered in each direction around the viewer
    pub fn chunk_radius(&self) -> i32 {
        (self.max_view_distance() / self.chunk_size()).round() as i32
    }

    /// Index of the band flagged as collider, if any
    pub fn collider_band(&self) -> Option<usize> {
        self.lod_bands.iter().position(|b| b.use_for_collider)
    }

    /// Viewer displacement threshold, squared
    pub fn sqr_move_threshold(&self) -> f32 {
        self.viewer_move_threshold * self.viewer_move_threshold
    }
}
