//! Seams between the control thread and asynchronous producers
//!
//! Height data and mesh builds are requested fire-and-forget. Producers hand
//! their results back through a [`CompletionSender`]; the streamer drains the
//! matching receiver on its own thread, so producers never touch chunk state.

use std::sync::Arc;

use glam::Vec2;
use tokio::sync::mpsc;

use crate::core::{Error, Result};
use crate::mesh::{HeightSampleGrid, LodLevel, MeshData};
use crate::streaming::chunk::ChunkCoord;

/// Result delivered back to the control thread
#[derive(Debug)]
pub enum Completion {
    /// Height samples for a chunk
    HeightData {
        coord: ChunkCoord,
        grid: HeightSampleGrid,
    },
    /// Finished (or failed) mesh build for one LOD slot of a chunk
    Mesh {
        coord: ChunkCoord,
        lod_index: usize,
        result: Result<MeshData>,
    },
}

impl Completion {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Completion::HeightData { coord, .. } | Completion::Mesh { coord, .. } => *coord,
        }
    }
}

/// Callback handle given to providers with every request
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    pub fn send(&self, completion: Completion) -> Result<()> {
        self.tx.send(completion).map_err(|_| Error::WorkerShutdown)
    }

    pub fn height_data(&self, coord: ChunkCoord, grid: HeightSampleGrid) -> Result<()> {
        self.send(Completion::HeightData { coord, grid })
    }

    pub fn mesh(&self, coord: ChunkCoord, lod_index: usize, result: Result<MeshData>) -> Result<()> {
        self.send(Completion::Mesh { coord, lod_index, result })
    }

    /// True once the receiving streamer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a completion channel
pub fn completion_channel() -> (CompletionSender, mpsc::UnboundedReceiver<Completion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, rx)
}

/// Request for one chunk's bordered height grid
#[derive(Clone, Debug, PartialEq)]
pub struct HeightRequest {
    pub coord: ChunkCoord,
    /// Chunk centre in chunk space
    pub center: Vec2,
    /// Grid side length including the border ring
    pub bordered_size: usize,
}

/// Request to build one LOD slot of a chunk
#[derive(Clone, Debug)]
pub struct MeshRequest {
    pub coord: ChunkCoord,
    /// Slot in the chunk's LOD table
    pub lod_index: usize,
    pub lod: LodLevel,
    pub grid: Arc<HeightSampleGrid>,
}

/// Produces height grids. Must eventually answer every request.
pub trait HeightMapProvider: Send {
    fn request_height_data(&self, request: HeightRequest, reply: CompletionSender);
}

/// Builds meshes off the control thread. Must eventually answer every request.
pub trait MeshBuildService: Send {
    fn request_mesh(&self, request: MeshRequest, reply: CompletionSender);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_in_order() {
        let (tx, mut rx) = completion_channel();
        let grid = HeightSampleGrid::from_fn(3, |_, _| 0.0);
        tx.height_data(ChunkCoord::new(1, 2), grid.clone()).unwrap();
        tx.mesh(ChunkCoord::new(3, 4), 1, Err(Error::WorkerShutdown)).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.coord(), ChunkCoord::new(1, 2));
        assert!(matches!(first, Completion::HeightData { grid: g, .. } if g == grid));

        let second = rx.try_recv().unwrap();
        assert!(matches!(second, Completion::Mesh { lod_index: 1, result: Err(_), .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = completion_channel();
        drop(rx);
        assert!(tx.is_closed());
        let grid = HeightSampleGrid::from_fn(3, |_, _| 0.0);
        assert!(matches!(
            tx.height_data(ChunkCoord::new(0, 0), grid),
            Err(Error::WorkerShutdown)
        ));
    }
}
