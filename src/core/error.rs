//! Error types for terrain meshing and streaming

use thiserror::Error;

use crate::streaming::chunk::ChunkCoord;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// The bordered grid cannot be walked with the requested stride.
    #[error("grid of bordered size {bordered_size} cannot be meshed with stride {stride}")]
    InvalidGridSize { bordered_size: usize, stride: usize },

    /// A mesh slot was asked to start a build it already started or finished.
    #[error("mesh for chunk {coord} at LOD slot {lod_index} was already requested")]
    DuplicateRequest { coord: ChunkCoord, lod_index: usize },

    #[error("expected {expected} height samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool has shut down")]
    WorkerShutdown,
}
