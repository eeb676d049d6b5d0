//! Vertex index spaces used while building a chunk mesh
//!
//! Interior vertices end up in the rendered mesh; border vertices only exist
//! to complete normals along the chunk edge. Keeping them in separate index
//! spaces means a border vertex can never leak into an emitted triangle.

/// Index of a visited grid sample in either the interior or the border space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexIndex {
    /// Slot in the rendered vertex arrays
    Interior(u32),
    /// Slot in the border working array
    Border(u32),
}

impl VertexIndex {
    /// Interior slot, or `None` for a border vertex
    #[inline]
    pub fn interior(self) -> Option<u32> {
        match self {
            VertexIndex::Interior(i) => Some(i),
            VertexIndex::Border(_) => None,
        }
    }

    #[inline]
    pub fn is_border(self) -> bool {
        matches!(self, VertexIndex::Border(_))
    }
}

/// Assigns interior and border indices in visitation order.
#[derive(Debug, Default)]
pub(crate) struct IndexAllocator {
    next_interior: u32,
    next_border: u32,
}

impl IndexAllocator {
    pub(crate) fn next(&mut self, border: bool) -> VertexIndex {
        if border {
            let idx = VertexIndex::Border(self.next_border);
            self.next_border += 1;
            idx
        } else {
            let idx = VertexIndex::Interior(self.next_interior);
            self.next_interior += 1;
            idx
        }
    }

    pub(crate) fn interior_count(&self) -> usize {
        self.next_interior as usize
    }

    pub(crate) fn border_count(&self) -> usize {
        self.next_border as usize
    }
}
