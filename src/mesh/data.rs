//! Finished chunk mesh and its GPU vertex layout

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use super::builder::LodLevel;

/// Interleaved vertex for renderer upload
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Renderable mesh for one chunk at one LOD.
///
/// Only interior vertices are stored; every index in `indices` is below
/// `vertex_count()`. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) uvs: Vec<Vec2>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) indices: Vec<u32>,
    pub(crate) vertices_per_line: u32,
    pub(crate) lod: LodLevel,
}

impl MeshData {
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Baked per-vertex normals, unit length unless fully degenerate
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Flat triangle list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn vertices_per_line(&self) -> u32 {
        self.vertices_per_line
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// LOD this mesh was built at
    pub fn lod(&self) -> LodLevel {
        self.lod
    }

    /// Interleave positions, normals and UVs for upload
    pub fn to_vertices(&self) -> Vec<TerrainVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| TerrainVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }

    /// Index buffer as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
