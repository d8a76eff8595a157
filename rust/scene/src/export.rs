// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flattened triangle export of a scene graph, in world coordinates

use serde::Serialize;

use crate::arena::SceneGraph;
use crate::error::Result;
use crate::materials::{Material, MaterialId, MaterialTable};
use crate::traversal::{DrawItem, SceneVisitor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTriangle {
    pub vertices: [[f32; 3]; 3],
    pub normals: [[f32; 3]; 3],
    pub material: MaterialId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedMaterial {
    pub id: MaterialId,
    #[serde(flatten)]
    pub material: Material,
}

/// Everything needed to draw a scene without its graph
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub materials: Vec<ExportedMaterial>,
    pub triangles: Vec<ExportTriangle>,
}

impl ExportDocument {
    pub fn new(graph: &SceneGraph, materials: &MaterialTable) -> Self {
        Self {
            materials: materials
                .iter()
                .map(|(id, material)| ExportedMaterial {
                    id,
                    material: material.clone(),
                })
                .collect(),
            triangles: export_triangles(graph),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Default)]
struct TriangleCollector {
    triangles: Vec<ExportTriangle>,
}

impl SceneVisitor for TriangleCollector {
    fn visit(&mut self, item: DrawItem<'_>) {
        let mesh = item.mesh.transformed(item.world);
        let position = |i: u32| -> [f32; 3] {
            let p = mesh.position(i as usize);
            [p.x as f32, p.y as f32, p.z as f32]
        };
        let normal = |i: u32| -> [f32; 3] {
            let n = mesh.normal(i as usize);
            [n.x as f32, n.y as f32, n.z as f32]
        };

        for tri in mesh.indices.chunks_exact(3) {
            self.triangles.push(ExportTriangle {
                vertices: [position(tri[0]), position(tri[1]), position(tri[2])],
                normals: [normal(tri[0]), normal(tri[1]), normal(tri[2])],
                material: item.material,
            });
        }
    }
}

/// Every triangle of `graph`, transformed to world space
pub fn export_triangles(graph: &SceneGraph) -> Vec<ExportTriangle> {
    let mut collector = TriangleCollector::default();
    graph.walk(&mut collector);
    collector.triangles
}

/// JSON document of `graph` with the materials its nodes use
pub fn to_json(graph: &SceneGraph, materials: &MaterialTable) -> Result<String> {
    ExportDocument::new(graph, materials).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use home3d_geometry::Mesh;
    use nalgebra::{Matrix4, Point3, Vector3};

    fn unit_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        let n = Vector3::z();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), n);
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), n);
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), n);
        mesh.add_triangle(a, b, c);
        mesh
    }

    #[test]
    fn triangles_are_in_world_space() {
        let mut graph = SceneGraph::new();
        let level = graph
            .add_transformed_group(graph.root(), "level", Matrix4::new_translation(&Vector3::new(0.0, 0.0, 300.0)))
            .unwrap();
        graph.add_leaf(level, unit_triangle(), MaterialId(2), None).unwrap();

        let triangles = export_triangles(&graph);
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].vertices[1], [1.0, 0.0, 300.0]);
        assert_eq!(triangles[0].normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(triangles[0].material, MaterialId(2));
    }

    #[test]
    fn rotated_instances_rotate_normals() {
        let mut graph = SceneGraph::new();
        let template = graph.add_mesh(std::sync::Arc::new(unit_triangle()));
        let quarter = Matrix4::new_rotation(Vector3::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0));
        graph.add_instance(graph.root(), template, quarter, MaterialId(0)).unwrap();

        let triangles = export_triangles(&graph);
        let n = triangles[0].normals[0];
        assert!(n[0].abs() < 1e-6);
        assert!((n[1] + 1.0).abs() < 1e-6);
        assert!(n[2].abs() < 1e-6);
    }

    #[test]
    fn document_serializes_materials_and_triangles() {
        let mut graph = SceneGraph::new();
        let mut materials = MaterialTable::new();
        let id = materials.color(0xff0000ff);
        graph.add_leaf(graph.root(), unit_triangle(), id, None).unwrap();

        let json = ExportDocument::new(&graph, &materials).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["materials"][0]["name"], "color-ff0000ff");
        assert_eq!(value["materials"][0]["id"], 0);
        assert_eq!(value["triangles"].as_array().map(Vec::len), Some(1));
    }
}
