//! Heightfield meshing with seam-free LOD normals

pub mod builder;
pub mod curve;
pub mod data;
pub mod grid;
pub mod index;

pub use builder::{GridMeshBuilder, LodLevel, MeshLayout, MeshSettings, build_mesh, sample_offset};
pub use curve::{HeightCurve, HeightRemap};
pub use data::{MeshData, TerrainVertex};
pub use grid::HeightSampleGrid;
pub use index::VertexIndex;
