//! Per-chunk LOD mesh slots
//!
//! Each configured LOD band owns one slot that moves
//! `NotRequested -> Requested -> Ready` (or `Failed`). A slot is only ever
//! requested once for the life of its chunk, so a viewer hovering around a
//! band boundary cannot queue the same build twice.

use std::sync::Arc;

use crate::core::{Error, Result};
use crate::core::config::LodBand;
use crate::mesh::{HeightSampleGrid, LodLevel, MeshData};
use crate::streaming::chunk::ChunkCoord;
use crate::streaming::provider::{CompletionSender, MeshBuildService, MeshRequest};

/// State of one LOD slot
#[derive(Clone, Debug, Default)]
pub enum MeshSlot {
    #[default]
    NotRequested,
    Requested,
    Ready(Arc<MeshData>),
    /// The build failed; the slot is never retried
    Failed,
}

impl MeshSlot {
    pub fn is_requested(&self) -> bool {
        !matches!(self, MeshSlot::NotRequested)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, MeshSlot::Ready(_))
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        match self {
            MeshSlot::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// What a completion did to its slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotUpdate {
    Ready,
    Failed,
}

/// One mesh slot per configured LOD band
#[derive(Debug)]
pub struct LodMeshCache {
    coord: ChunkCoord,
    levels: Vec<LodLevel>,
    slots: Vec<MeshSlot>,
}

impl LodMeshCache {
    pub fn new(coord: ChunkCoord, bands: &[LodBand]) -> Self {
        Self {
            coord,
            levels: bands.iter().map(|b| b.lod).collect(),
            slots: vec![MeshSlot::NotRequested; bands.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&MeshSlot> {
        self.slots.get(index)
    }

    pub fn mesh(&self, index: usize) -> Option<&Arc<MeshData>> {
        self.slots.get(index).and_then(MeshSlot::mesh)
    }

    /// LOD built by slot `index`
    pub fn level(&self, index: usize) -> Option<LodLevel> {
        self.levels.get(index).copied()
    }

    /// Slots with a build still in flight
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, MeshSlot::Requested)).count()
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_ready()).count()
    }

    /// Mark slot `index` as requested.
    ///
    /// Fails with [`Error::DuplicateRequest`] unless the slot was untouched.
    pub fn mark_requested(&mut self, index: usize) -> Result<()> {
        let coord = self.coord;
        let slot = self.slot_mut(index)?;
        if slot.is_requested() {
            return Err(Error::DuplicateRequest { coord, lod_index: index });
        }
        *slot = MeshSlot::Requested;
        Ok(())
    }

    /// Start a build for slot `index` unless one was already started.
    ///
    /// Returns `true` if a request was sent to `service`.
    pub fn ensure(
        &mut self,
        index: usize,
        grid: &Arc<HeightSampleGrid>,
        service: &dyn MeshBuildService,
        reply: &CompletionSender,
    ) -> Result<bool> {
        if self.slot_mut(index)?.is_requested() {
            return Ok(false);
        }
        self.mark_requested(index)?;

        let request = MeshRequest {
            coord: self.coord,
            lod_index: index,
            lod: self.levels[index],
            grid: Arc::clone(grid),
        };
        log::debug!("Requesting mesh for chunk {} slot {} ({:?})", self.coord, index, request.lod);
        service.request_mesh(request, reply.clone());
        Ok(true)
    }

    /// Store the result of a build started by [`ensure`](Self::ensure).
    ///
    /// A result for a slot that is not waiting on a build is rejected with
    /// [`Error::DuplicateRequest`] and leaves the slot untouched.
    pub fn complete(&mut self, index: usize, result: Result<MeshData>) -> Result<SlotUpdate> {
        let coord = self.coord;
        let slot = self.slot_mut(index)?;
        if !matches!(slot, MeshSlot::Requested) {
            return Err(Error::DuplicateRequest { coord, lod_index: index });
        }

        match result {
            Ok(mesh) => {
                *slot = MeshSlot::Ready(Arc::new(mesh));
                Ok(SlotUpdate::Ready)
            }
            Err(e) => {
                log::error!("Mesh build for chunk {} slot {} failed: {}", coord, index, e);
                *slot = MeshSlot::Failed;
                Ok(SlotUpdate::Failed)
            }
        }
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut MeshSlot> {
        let len = self.slots.len();
        self.slots.get_mut(index).ok_or_else(|| {
            Error::InvalidConfig(format!("LOD slot {index} out of range ({len} slots)"))
        })
    }
}
