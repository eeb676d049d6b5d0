//! Chunk streaming and LOD management

pub mod chunk;
pub mod lod;
pub mod lod_cache;
pub mod provider;
pub mod streamer;
pub mod viewer;
pub mod worker;

pub use chunk::{ChunkCoord, ChunkRefresh, ChunkState, RefreshContext, TerrainChunk};
pub use lod::{LodDecision, evaluate_bands, select_band, within_view};
pub use lod_cache::{LodMeshCache, MeshSlot, SlotUpdate};
pub use provider::{
    Completion, CompletionSender, HeightMapProvider, HeightRequest, MeshBuildService, MeshRequest,
    completion_channel,
};
pub use streamer::{ChunkStreamer, StreamingStats};
pub use viewer::ViewerState;
pub use worker::{GridHeightProvider, HeightSource, ThreadedMeshBuilder, WorkerPool, sample_grid};
