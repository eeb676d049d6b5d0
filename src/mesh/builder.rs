//! Heightfield to LOD mesh conversion
//!
//! The bordered grid is walked in steps of the LOD stride. Samples on the
//! outer ring become border vertices, everything else becomes an interior
//! vertex. Triangles touching any border vertex are kept aside and only
//! used to finish the normal sums, so edge normals match the neighbouring
//! chunk without any of the border geometry being rendered.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::curve::{HeightCurve, HeightRemap};
use super::data::MeshData;
use super::grid::HeightSampleGrid;
use super::index::{IndexAllocator, VertexIndex};
use crate::core::{Error, Result};

/// Discrete level of detail. Higher values give coarser meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LodLevel(pub u32);

impl LodLevel {
    /// Full resolution
    pub const FULL: LodLevel = LodLevel(0);

    /// Number of source samples between consecutive mesh vertices.
    ///
    /// LOD 0 keeps every sample; LOD n > 0 keeps every `2n`th.
    ///
    /// # Examples
    /// ```
    /// use terrastream::mesh::LodLevel;
    ///
    /// assert_eq!(LodLevel(0).stride(), 1);
    /// assert_eq!(LodLevel(1).stride(), 2);
    /// assert_eq!(LodLevel(4).stride(), 8);
    /// ```
    pub fn stride(self) -> usize {
        if self.0 == 0 { 1 } else { self.0 as usize * 2 }
    }
}

/// Height scaling applied while meshing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Multiplier applied after the curve
    pub height_scale: f32,
    /// Remap applied to raw samples
    pub height_curve: HeightCurve,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_scale: 40.0,
            height_curve: HeightCurve::identity(),
        }
    }
}

/// Derived sizes for meshing a bordered grid at one LOD
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshLayout {
    /// Grid side including the border ring
    pub bordered_size: usize,
    pub stride: usize,
    /// Samples spanned by interior vertices plus one (`bordered - 2 * stride`)
    pub mesh_size: usize,
    /// Chunk samples per side (`bordered - 2`)
    pub mesh_size_simple: usize,
    /// Interior vertices per row
    pub vertices_per_line: usize,
    /// Visited samples per row, border included
    pub samples_per_line: usize,
}

impl MeshLayout {
    /// Compute the layout, rejecting grids the stride cannot walk cleanly.
    ///
    /// The walk must land on the last row/column of the grid, and at least
    /// one interior quad must remain.
    pub fn new(bordered_size: usize, lod: LodLevel) -> Result<Self> {
        let stride = lod.stride();
        let invalid = Error::InvalidGridSize { bordered_size, stride };

        if bordered_size < 3 * stride + 1 || (bordered_size - 1) % stride != 0 {
            return Err(invalid);
        }

        let mesh_size = bordered_size - 2 * stride;
        let vertices_per_line = (mesh_size - 1) / stride + 1;

        Ok(Self {
            bordered_size,
            stride,
            mesh_size,
            mesh_size_simple: bordered_size - 2,
            vertices_per_line,
            samples_per_line: (bordered_size - 1) / stride + 1,
        })
    }

    /// World-space side length of the chunk mesh (in sample units)
    pub fn extent(&self) -> f32 {
        (self.mesh_size_simple - 1) as f32
    }

    /// Fractional position of sample `(x, y)` across the interior span.
    ///
    /// 0 at the first interior vertex, 1 at the last; border samples fall
    /// just outside that range.
    fn percent(&self, x: usize, y: usize) -> Vec2 {
        let span = (self.mesh_size - 1) as f32;
        let s = self.stride as f32;
        Vec2::new((x as f32 - s) / span, (y as f32 - s) / span)
    }
}

/// Plane offset of grid sample `(x, y)` from the chunk centre, in sample units.
///
/// Height providers sample at these offsets so that neighbouring chunks
/// share edge samples. Rows advance toward -Z.
pub fn sample_offset(bordered_size: usize, x: usize, y: usize) -> Vec2 {
    let half = bordered_size.saturating_sub(3) as f32 * 0.5;
    Vec2::new(-half + x as f32 - 1.0, half - (y as f32 - 1.0))
}

/// Converts height grids into LOD meshes. Stateless and thread safe.
///
/// Samples go through `curve` and are then multiplied by `height_scale`.
/// The curve defaults to the serializable [`HeightCurve`], but any
/// [`HeightRemap`] (including a closure) works.
pub struct GridMeshBuilder<'a, C: HeightRemap + ?Sized = HeightCurve> {
    height_scale: f32,
    curve: &'a C,
}

impl<'a> GridMeshBuilder<'a> {
    pub fn from_settings(settings: &'a MeshSettings) -> Self {
        Self::new(settings.height_scale, &settings.height_curve)
    }
}

impl<'a, C: HeightRemap + ?Sized> GridMeshBuilder<'a, C> {
    pub fn new(height_scale: f32, curve: &'a C) -> Self {
        Self { height_scale, curve }
    }

    /// Build the mesh for `grid` at `lod`.
    pub fn build(&self, grid: &HeightSampleGrid, lod: LodLevel) -> Result<MeshData> {
        let layout = MeshLayout::new(grid.bordered_size(), lod)?;
        let n = layout.samples_per_line;
        let stride = layout.stride;

        // Index map over visited samples, row-major
        let mut alloc = IndexAllocator::default();
        let mut index_map = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                index_map.push(alloc.next(grid.is_border(i * stride, j * stride)));
            }
        }

        let vertex_count = layout.vertices_per_line * layout.vertices_per_line;
        debug_assert_eq!(alloc.interior_count(), vertex_count);

        let mut work = MeshWork {
            positions: vec![Vec3::ZERO; vertex_count],
            uvs: vec![Vec2::ZERO; vertex_count],
            border_positions: vec![Vec3::ZERO; alloc.border_count()],
            triangles: Vec::with_capacity((layout.vertices_per_line - 1).pow(2) * 6),
            border_triangles: Vec::with_capacity(n * 24),
        };

        let extent = layout.extent();
        let top_left = Vec2::new(-extent * 0.5, extent * 0.5);

        for j in 0..n {
            for i in 0..n {
                let (x, y) = (i * stride, j * stride);
                let percent = layout.percent(x, y);
                let height = self.curve.remap(grid.get(x, y)) * self.height_scale;
                let position = Vec3::new(
                    top_left.x + percent.x * extent,
                    height,
                    top_left.y - percent.y * extent,
                );
                work.add_vertex(index_map[j * n + i], position, percent);

                if i < n - 1 && j < n - 1 {
                    let a = index_map[j * n + i];
                    let b = index_map[j * n + i + 1];
                    let c = index_map[(j + 1) * n + i];
                    let d = index_map[(j + 1) * n + i + 1];
                    work.add_triangle(a, d, c);
                    work.add_triangle(d, a, b);
                }
            }
        }

        let normals = work.bake_normals();

        Ok(MeshData {
            positions: work.positions,
            uvs: work.uvs,
            normals,
            indices: work.triangles,
            vertices_per_line: layout.vertices_per_line as u32,
            lod,
        })
    }
}

/// Build with settings in one call
pub fn build_mesh(grid: &HeightSampleGrid, settings: &MeshSettings, lod: LodLevel) -> Result<MeshData> {
    GridMeshBuilder::from_settings(settings).build(grid, lod)
}

/// Working arrays; the border half is dropped once normals are baked.
struct MeshWork {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    border_positions: Vec<Vec3>,
    triangles: Vec<u32>,
    border_triangles: Vec<[VertexIndex; 3]>,
}

impl MeshWork {
    fn add_vertex(&mut self, index: VertexIndex, position: Vec3, uv: Vec2) {
        match index {
            VertexIndex::Interior(i) => {
                self.positions[i as usize] = position;
                self.uvs[i as usize] = uv;
            }
            VertexIndex::Border(b) => self.border_positions[b as usize] = position,
        }
    }

    fn add_triangle(&mut self, a: VertexIndex, b: VertexIndex, c: VertexIndex) {
        match (a.interior(), b.interior(), c.interior()) {
            (Some(a), Some(b), Some(c)) => self.triangles.extend_from_slice(&[a, b, c]),
            _ => self.border_triangles.push([a, b, c]),
        }
    }

    fn position(&self, index: VertexIndex) -> Vec3 {
        match index {
            VertexIndex::Interior(i) => self.positions[i as usize],
            VertexIndex::Border(b) => self.border_positions[b as usize],
        }
    }

    fn face_normal(&self, a: VertexIndex, b: VertexIndex, c: VertexIndex) -> Vec3 {
        let pa = self.position(a);
        let ab = self.position(b) - pa;
        let ac = self.position(c) - pa;
        ab.cross(ac).normalize_or_zero()
    }

    fn bake_normals(&self) -> Vec<Vec3> {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.triangles.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(VertexIndex::Interior);
            let normal = self.face_normal(a, b, c);
            for i in tri {
                acc[*i as usize] += normal;
            }
        }

        for &[a, b, c] in &self.border_triangles {
            if a.is_border() && b.is_border() && c.is_border() {
                continue;
            }
            let normal = self.face_normal(a, b, c);
            for i in [a, b, c].into_iter().filter_map(VertexIndex::interior) {
                acc[i as usize] += normal;
            }
        }

        acc.into_iter().map(Vec3::normalize_or_zero).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wavy(p: Vec2) -> f32 {
        (p.x * 0.3).sin() * 2.0 + (p.y * 0.2).cos() * 1.5
    }

    /// Sample `f` for a chunk centred at `center` (sample units)
    fn grid_at(bordered: usize, center: Vec2, f: impl Fn(Vec2) -> f32) -> HeightSampleGrid {
        HeightSampleGrid::from_fn(bordered, |x, y| f(center + sample_offset(bordered, x, y)))
    }

    fn flat_builder(curve: &HeightCurve) -> GridMeshBuilder<'_> {
        GridMeshBuilder::new(1.0, curve)
    }

    #[test]
    fn test_stride() {
        assert_eq!(LodLevel(0).stride(), 1);
        assert_eq!(LodLevel(1).stride(), 2);
        assert_eq!(LodLevel(3).stride(), 6);
        assert_eq!(LodLevel::FULL.stride(), 1);
    }

    #[test]
    fn test_layout_vertices_per_line() {
        // bordered 13 -> 11 chunk samples
        let l0 = MeshLayout::new(13, LodLevel(0)).unwrap();
        assert_eq!(l0.mesh_size, 11);
        assert_eq!(l0.vertices_per_line, 11);
        assert_eq!(l0.samples_per_line, 13);

        let l1 = MeshLayout::new(13, LodLevel(1)).unwrap();
        assert_eq!(l1.mesh_size, 9);
        assert_eq!(l1.vertices_per_line, 5);
        assert_eq!(l1.samples_per_line, 7);

        let l2 = MeshLayout::new(13, LodLevel(2)).unwrap();
        assert_eq!(l2.vertices_per_line, 2);
    }

    #[test]
    fn test_invalid_grid_sizes() {
        // Stride 6 leaves a single interior vertex
        assert!(matches!(
            MeshLayout::new(13, LodLevel(3)),
            Err(Error::InvalidGridSize { bordered_size: 13, stride: 6 })
        ));
        // Stride 2 cannot land on the last column of an even grid
        assert!(MeshLayout::new(12, LodLevel(1)).is_err());
        // Too small for anything
        assert!(MeshLayout::new(3, LodLevel(0)).is_err());
        assert!(MeshLayout::new(4, LodLevel(0)).is_ok());

        let curve = HeightCurve::identity();
        let grid = HeightSampleGrid::from_fn(13, |_, _| 0.0);
        let err = flat_builder(&curve).build(&grid, LodLevel(3)).unwrap_err();
        assert!(matches!(err, Error::InvalidGridSize { .. }));
    }

    #[test]
    fn test_vertex_and_triangle_counts() {
        let curve = HeightCurve::identity();
        let grid = grid_at(13, Vec2::ZERO, wavy);
        for lod in [0, 1, 2] {
            let lod = LodLevel(lod);
            let layout = MeshLayout::new(13, lod).unwrap();
            let mesh = flat_builder(&curve).build(&grid, lod).unwrap();
            let vpl = layout.vertices_per_line;
            assert_eq!(mesh.vertices_per_line() as usize, vpl);
            assert_eq!(mesh.vertex_count(), vpl * vpl);
            assert_eq!(mesh.uvs().len(), vpl * vpl);
            assert_eq!(mesh.normals().len(), vpl * vpl);
            assert_eq!(mesh.triangle_count(), (vpl - 1) * (vpl - 1) * 2);
            assert_eq!(mesh.lod(), lod);
        }
    }

    #[test]
    fn test_indices_stay_interior() {
        let curve = HeightCurve::identity();
        let grid = grid_at(13, Vec2::ZERO, wavy);
        for lod in [0, 1, 2] {
            let mesh = flat_builder(&curve).build(&grid, LodLevel(lod)).unwrap();
            let count = mesh.vertex_count() as u32;
            assert!(mesh.indices().iter().all(|&i| i < count));
        }
    }

    #[test]
    fn test_normals_unit_length() {
        let curve = HeightCurve::identity();
        let grid = grid_at(13, Vec2::new(3.0, -7.0), wavy);
        for lod in [0, 1, 2] {
            let mesh = GridMeshBuilder::new(4.0, &curve).build(&grid, LodLevel(lod)).unwrap();
            for n in mesh.normals() {
                assert!((n.length() - 1.0).abs() < 1e-4, "normal {n:?} not unit length");
            }
        }
    }

    #[test]
    fn test_flat_grid_normals_point_up() {
        let curve = HeightCurve::identity();
        let grid = HeightSampleGrid::from_fn(9, |_, _| 0.5);
        let mesh = GridMeshBuilder::new(10.0, &curve).build(&grid, LodLevel(0)).unwrap();
        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            assert_eq!(p.y, 5.0);
            assert!((*n - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn test_sloped_plane_normal() {
        // h = x  =>  normal ~ (-1, 1, 0) / sqrt(2), including edge vertices
        let curve = HeightCurve::identity();
        let grid = grid_at(9, Vec2::ZERO, |p| p.x);
        let mesh = flat_builder(&curve).build(&grid, LodLevel(0)).unwrap();
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        for n in mesh.normals() {
            assert!((*n - expected).length() < 1e-5, "got {n:?}");
        }
    }

    #[test]
    fn test_positions_span_chunk() {
        let curve = HeightCurve::identity();
        let grid = HeightSampleGrid::from_fn(13, |_, _| 0.0);
        for lod in [0, 1, 2] {
            let mesh = flat_builder(&curve).build(&grid, LodLevel(lod)).unwrap();
            let vpl = mesh.vertices_per_line() as usize;
            let first = mesh.positions()[0];
            let last = mesh.positions()[vpl * vpl - 1];
            // extent is 10 sample units; rows run toward -Z
            assert!((first.x + 5.0).abs() < 1e-5 && (first.z - 5.0).abs() < 1e-5);
            assert!((last.x - 5.0).abs() < 1e-5 && (last.z + 5.0).abs() < 1e-5);
            assert_eq!(mesh.uvs()[0], Vec2::ZERO);
            assert!((mesh.uvs()[vpl * vpl - 1] - Vec2::ONE).length() < 1e-6);
        }
    }

    #[test]
    fn test_height_curve_and_scale_applied() {
        let curve = HeightCurve::from_keys([(0.0, 0.0), (1.0, 0.5)]);
        let grid = HeightSampleGrid::from_fn(5, |_, _| 1.0);
        let mesh = GridMeshBuilder::new(8.0, &curve).build(&grid, LodLevel(0)).unwrap();
        assert!(mesh.positions().iter().all(|p| (p.y - 4.0).abs() < 1e-6));
    }

    #[test]
    fn test_closure_remap() {
        let grid = HeightSampleGrid::from_fn(5, |x, _| x as f32 * 0.25);
        let smooth = |h: f32| h * h * (3.0 - 2.0 * h);
        let mesh = GridMeshBuilder::new(2.0, &smooth).build(&grid, LodLevel(0)).unwrap();
        let vpl = mesh.vertices_per_line() as usize;
        // Interior columns sample x = 1, 2, 3 -> 0.25, 0.5, 0.75
        let heights: Vec<f32> = mesh.positions()[..vpl].iter().map(|p| p.y).collect();
        let expected = [0.15625 * 2.0, 1.0, 0.84375 * 2.0];
        for (h, e) in heights.iter().zip(expected) {
            assert!((h - e).abs() < 1e-6, "got {h}, expected {e}");
        }

        // A closure that matches a curve gives the same mesh
        let curve = HeightCurve::from_keys([(0.0, 0.0), (1.0, 0.5)]);
        let halve = |h: f32| h * 0.5;
        let a = GridMeshBuilder::new(2.0, &curve).build(&grid, LodLevel(0)).unwrap();
        let b = GridMeshBuilder::new(2.0, &halve).build(&grid, LodLevel(0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_border_rows_shape_edge_normals() {
        // A ridge along the border ring only: interior is flat, but the edge
        // vertices must tilt because of the border triangles.
        let curve = HeightCurve::identity();
        let grid = HeightSampleGrid::from_fn(7, |x, _| if x == 0 { 5.0 } else { 0.0 });
        let mesh = flat_builder(&curve).build(&grid, LodLevel(0)).unwrap();
        let vpl = mesh.vertices_per_line() as usize;
        let edge = mesh.normals()[vpl * 2];
        let centre = mesh.normals()[vpl * 2 + 2];
        assert!(edge.x > 0.1, "edge normal should lean away from the ridge: {edge:?}");
        assert!((centre - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_seam_normals_match_combined_grid() {
        let bordered = 13;
        let extent = (bordered - 3) as f32;
        let curve = HeightCurve::identity();
        let builder = GridMeshBuilder::new(1.0, &curve);

        let left = builder.build(&grid_at(bordered, Vec2::ZERO, wavy), LodLevel(0)).unwrap();
        let right = builder
            .build(&grid_at(bordered, Vec2::new(extent, 0.0), wavy), LodLevel(0))
            .unwrap();

        // One grid covering both chunks, centred on their shared edge
        let combined_bordered = 2 * bordered - 3;
        let combined = builder
            .build(&grid_at(combined_bordered, Vec2::new(extent * 0.5, 0.0), wavy), LodLevel(0))
            .unwrap();

        let vpl = left.vertices_per_line() as usize;
        let vpl_c = combined.vertices_per_line() as usize;
        let row_shift = (extent * 0.5) as usize;

        for row in 0..vpl {
            let crow = row + row_shift;
            // Left chunk's last column and right chunk's first column share
            // the combined grid's middle column
            let l = left.normals()[row * vpl + vpl - 1];
            let r = right.normals()[row * vpl];
            let c = combined.normals()[crow * vpl_c + vpl - 1];
            assert!((l - c).length() < 1e-4, "row {row}: left {l:?} vs combined {c:?}");
            assert!((r - c).length() < 1e-4, "row {row}: right {r:?} vs combined {c:?}");

            for col in 0..vpl {
                let l = left.normals()[row * vpl + col];
                let c = combined.normals()[crow * vpl_c + col];
                assert!((l - c).length() < 1e-4);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let curve = HeightCurve::from_keys([(-4.0, -1.0), (4.0, 6.0)]);
        let grid = grid_at(13, Vec2::new(1.0, 2.0), wavy);
        let a = GridMeshBuilder::new(3.0, &curve).build(&grid, LodLevel(1)).unwrap();
        let b = build_mesh(
            &grid,
            &MeshSettings { height_scale: 3.0, height_curve: curve.clone() },
            LodLevel(1),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
