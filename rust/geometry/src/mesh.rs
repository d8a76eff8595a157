// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::opening::OpeningId;
use crate::wall::WallSide;
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Default crease angle (degrees) used to smooth curved surfaces
pub const DEFAULT_CREASE_ANGLE: f64 = 44.0;

/// Triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v); empty when the mesh is untextured
    pub uvs: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

/// Which part of a wall, room or opening a sub-mesh draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    WallSide(WallSide),
    WallTop,
    WallBottom,
    /// Sill or lintel faces inside an opening
    OpeningEdge(WallSide),
    Baseboard(WallSide),
    /// Patch and jambs filling the gap around an opening's model
    OpeningSurround { opening: OpeningId, side: WallSide },
    RoomFloor,
    RoomCeiling,
}

/// A sub-mesh tagged with the surface it draws
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub surface: Surface,
    pub mesh: Mesh,
}

impl SubMesh {
    /// Create a new sub-mesh
    pub fn new(surface: Surface, mesh: Mesh) -> Self {
        Self { surface, mesh }
    }
}

/// Collection of sub-meshes from one element, preserving per-surface identity
#[derive(Debug, Clone, Default)]
pub struct SubMeshCollection {
    pub sub_meshes: Vec<SubMesh>,
}

impl SubMeshCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self { sub_meshes: Vec::new() }
    }

    /// Add a sub-mesh; empty meshes are ignored
    pub fn add(&mut self, surface: Surface, mesh: Mesh) {
        if !mesh.is_empty() {
            self.sub_meshes.push(SubMesh::new(surface, mesh));
        }
    }

    /// Add a sub-mesh if one was built
    pub fn add_opt(&mut self, surface: Surface, mesh: Option<Mesh>) {
        if let Some(mesh) = mesh {
            self.add(surface, mesh);
        }
    }

    /// Check if collection is empty
    pub fn is_empty(&self) -> bool {
        self.sub_meshes.is_empty()
    }

    /// Get number of sub-meshes
    pub fn len(&self) -> usize {
        self.sub_meshes.len()
    }

    /// Sub-meshes drawing `surface`
    pub fn surface(&self, surface: Surface) -> impl Iterator<Item = &Mesh> {
        self.sub_meshes
            .iter()
            .filter(move |s| s.surface == surface)
            .map(|s| &s.mesh)
    }

    /// Iterate over sub-meshes
    pub fn iter(&self) -> impl Iterator<Item = &SubMesh> {
        self.sub_meshes.iter()
    }
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
        index
    }

    /// Add a vertex with normal and texture coordinates
    ///
    /// Either every vertex of a mesh has texture coordinates or none has.
    #[inline]
    pub fn add_textured_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: Point2<f64>) -> u32 {
        self.uvs.push(uv.x as f32);
        self.uvs.push(uv.y as f32);
        self.add_vertex(position, normal)
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Add the two triangles of quad `a b c d` (counter-clockwise from the front)
    #[inline]
    pub fn add_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.add_triangle(a, b, c);
        self.add_triangle(a, c, d);
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// Position of vertex `i`
    #[inline]
    pub fn position(&self, i: usize) -> Point3<f64> {
        Point3::new(
            self.positions[i * 3] as f64,
            self.positions[i * 3 + 1] as f64,
            self.positions[i * 3 + 2] as f64,
        )
    }

    /// Normal of vertex `i`
    #[inline]
    pub fn normal(&self, i: usize) -> Vector3<f64> {
        Vector3::new(
            self.normals[i * 3] as f64,
            self.normals[i * 3 + 1] as f64,
            self.normals[i * 3 + 2] as f64,
        )
    }

    /// Texture coordinates of vertex `i`, if the mesh has any
    #[inline]
    pub fn uv(&self, i: usize) -> Option<Point2<f64>> {
        if self.uvs.len() < (i + 1) * 2 {
            return None;
        }
        Some(Point2::new(self.uvs[i * 2] as f64, self.uvs[i * 2 + 1] as f64))
    }

    /// Merge another mesh into this one
    ///
    /// Texture coordinates survive only if both meshes have them or this
    /// one is empty.
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let keep_uvs = (self.is_empty() || self.has_uvs()) && other.has_uvs();
        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        if keep_uvs {
            self.uvs.extend_from_slice(&other.uvs);
        } else {
            self.uvs.clear();
        }

        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Calculate bounds (min, max)
    #[inline]
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }

    /// Sum of triangle areas
    pub fn surface_area(&self) -> f64 {
        self.indices
            .chunks_exact(3)
            .map(|t| {
                let a = self.position(t[0] as usize);
                let b = self.position(t[1] as usize);
                let c = self.position(t[2] as usize);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    /// Copy of the mesh with positions and normals mapped through `transform`
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Mesh {
        let linear: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);

        let mut out = self.clone();
        for (pos, normal) in out
            .positions
            .chunks_exact_mut(3)
            .zip(out.normals.chunks_exact_mut(3))
        {
            let p = transform.transform_point(&Point3::new(pos[0] as f64, pos[1] as f64, pos[2] as f64));
            pos[0] = p.x as f32;
            pos[1] = p.y as f32;
            pos[2] = p.z as f32;

            let n = normal_matrix * Vector3::new(normal[0] as f64, normal[1] as f64, normal[2] as f64);
            let n = n.try_normalize(1e-12).unwrap_or(n);
            normal[0] = n.x as f32;
            normal[1] = n.y as f32;
            normal[2] = n.z as f32;
        }
        // Mirroring transforms flip the winding
        if linear.determinant() < 0.0 {
            for t in out.indices.chunks_exact_mut(3) {
                t.swap(1, 2);
            }
        }
        out
    }

    /// Average the normals of vertices sharing a position whose normals
    /// differ by less than `crease_angle` (degrees)
    ///
    /// Expects per-face normals on input, as the face builders produce.
    pub fn smooth_normals(&mut self, crease_angle: f64) {
        let cos_limit = crease_angle.to_radians().cos();
        let mut groups: FxHashMap<[u32; 3], Vec<usize>> = FxHashMap::default();
        for (i, p) in self.positions.chunks_exact(3).enumerate() {
            groups
                .entry([p[0].to_bits(), p[1].to_bits(), p[2].to_bits()])
                .or_default()
                .push(i);
        }

        let face_normals: Vec<Vector3<f64>> = (0..self.vertex_count()).map(|i| self.normal(i)).collect();
        for members in groups.values() {
            if members.len() < 2 {
                continue;
            }
            for &v in members {
                let own = face_normals[v];
                let sum: Vector3<f64> = members
                    .iter()
                    .map(|&u| face_normals[u])
                    .filter(|n| n.dot(&own) >= cos_limit)
                    .sum();
                if let Some(n) = sum.try_normalize(1e-12) {
                    self.normals[v * 3] = n.x as f32;
                    self.normals[v * 3 + 1] = n.y as f32;
                    self.normals[v * 3 + 2] = n.z as f32;
                }
            }
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Recompute smooth vertex normals from triangle geometry
pub fn calculate_normals(mesh: &mut Mesh) {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 {
        return;
    }

    let mut normals = vec![Vector3::zeros(); vertex_count];

    // Accumulate area-weighted face normals
    for t in mesh.indices.chunks_exact(3) {
        let (i0, i1, i2) = (t[0] as usize, t[1] as usize, t[2] as usize);
        let v0 = mesh.position(i0);
        let normal = (mesh.position(i1) - v0).cross(&(mesh.position(i2) - v0));
        normals[i0] += normal;
        normals[i1] += normal;
        normals[i2] += normal;
    }

    mesh.normals.clear();
    mesh.normals.reserve(vertex_count * 3);

    for normal in normals {
        let normalized = normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        mesh.normals.push(normalized.x as f32);
        mesh.normals.push(normalized.y as f32);
        mesh.normals.push(normalized.z as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_quad() -> Mesh {
        let mut mesh = Mesh::new();
        let n = Vector3::z();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), n);
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), n);
        let c = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0), n);
        let d = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), n);
        mesh.add_quad(a, b, c, d);
        mesh
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_add_vertex() {
        let mut mesh = Mesh::new();
        let i = mesh.add_vertex(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(i, 0);
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0]);
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn test_merge() {
        let mut mesh1 = unit_quad();
        let mesh2 = unit_quad();
        mesh1.merge(&mesh2);
        assert_eq!(mesh1.vertex_count(), 8);
        assert_eq!(mesh1.triangle_count(), 4);
        assert_eq!(&mesh1.indices[6..9], &[4, 5, 6]);
    }

    #[test]
    fn test_merge_drops_partial_uvs() {
        let mut textured = Mesh::new();
        textured.add_textured_vertex(Point3::origin(), Vector3::z(), Point2::new(0.5, 0.5));
        let mut merged = textured.clone();
        merged.merge(&textured);
        assert_eq!(merged.uvs.len(), 4);

        merged.merge(&unit_quad());
        assert!(!merged.has_uvs());
    }

    #[test]
    fn test_surface_area() {
        assert_relative_eq!(unit_quad().surface_area(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transformed_mirror_flips_winding() {
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let mesh = unit_quad();
        let mirrored = mesh.transformed(&mirror);
        assert_eq!(&mirrored.indices[0..3], &[0, 2, 1]);
        assert_relative_eq!(mirrored.position(1).x, -1.0);
        assert_relative_eq!(mirrored.normal(0).z, 1.0);
    }

    #[test]
    fn test_smooth_normals_respects_crease() {
        // Two faces sharing an edge at 30 degrees and one at 90 degrees
        let mut mesh = Mesh::new();
        let shared = Point3::new(0.0, 0.0, 0.0);
        let n1 = Vector3::new(0.0, -1.0, 0.0);
        let n2 = Vector3::new(0.5, -(3.0f64.sqrt() / 2.0), 0.0);
        let n3 = Vector3::new(1.0, 0.0, 0.0);
        mesh.add_vertex(shared, n1);
        mesh.add_vertex(shared, n2);
        mesh.add_vertex(shared, n3);
        mesh.smooth_normals(DEFAULT_CREASE_ANGLE);

        let smoothed = mesh.normal(0);
        assert!(smoothed.x > 0.0);
        // The 90 degree face keeps its own normal
        assert_relative_eq!(mesh.normal(2).x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_calculate_normals() {
        let mut mesh = unit_quad();
        mesh.normals.iter_mut().for_each(|n| *n = 0.0);
        calculate_normals(&mut mesh);
        assert_relative_eq!(mesh.normal(0).z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sub_mesh_collection() {
        let mut parts = SubMeshCollection::new();
        parts.add(Surface::WallTop, unit_quad());
        parts.add(Surface::WallBottom, Mesh::new());
        parts.add_opt(Surface::RoomFloor, None);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts.surface(Surface::WallTop).count(), 1);
        assert_eq!(parts.iter().map(|s| s.mesh.triangle_count()).sum::<usize>(), 2);
    }
}
