// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model silhouettes
//!
//! Projects every triangle of a model mesh onto a plane and unions the
//! results. Door and window models are projected from the front to carve
//! surrounds; staircase models are projected from the top to cut floors.

use crate::area::Area;
use crate::mesh::Mesh;
use crate::path::WindingRule;
use crate::polygon::{compute_signed_area, contour_bounds};
use nalgebra::{Matrix3, Point2, Point3};

/// Triangles whose projected area is below this are ignored
const DEGENERATE_AREA: f64 = 1e-12;

/// Plane a model is projected on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Looking along +y: keeps (x, z)
    Front,
    /// Looking down -z: keeps (x, y)
    Top,
}

impl Projection {
    #[inline]
    fn project(self, p: &Point3<f64>) -> Point2<f64> {
        match self {
            Projection::Front => Point2::new(p.x, p.z),
            Projection::Top => Point2::new(p.x, p.y),
        }
    }
}

/// Projected points of `mesh` after `rotation`, in vertex order
fn projected_points(mesh: &Mesh, rotation: &Matrix3<f64>, projection: Projection) -> Vec<Point2<f64>> {
    (0..mesh.vertex_count())
        .map(|i| {
            let p = mesh.position(i);
            projection.project(&Point3::from(rotation * p.coords))
        })
        .collect()
}

/// Union of the projections of every triangle of `mesh`
pub fn project_silhouette(mesh: &Mesh, rotation: &Matrix3<f64>, projection: Projection) -> Area {
    let points = projected_points(mesh, rotation, projection);
    let mut contours = Vec::with_capacity(mesh.triangle_count());

    for t in mesh.indices.chunks_exact(3) {
        let mut triangle = vec![points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]];
        let area = compute_signed_area(&triangle);
        if area.abs() < DEGENERATE_AREA {
            continue;
        }
        if area < 0.0 {
            triangle.reverse();
        }
        contours.push(triangle);
    }

    Area::from_contours(&contours, WindingRule::NonZero)
}

/// Silhouette of `mesh` scaled into `[-0.5, 0.5]²`, relative to the
/// projected bounds of the whole mesh
///
/// Returns `None` when the mesh is flat in the projection plane.
pub fn normalized_silhouette(mesh: &Mesh, rotation: &Matrix3<f64>, projection: Projection) -> Option<Area> {
    let (min, max) = contour_bounds(&projected_points(mesh, rotation, projection))?;
    let size = max - min;
    if size.x < DEGENERATE_AREA || size.y < DEGENERATE_AREA {
        return None;
    }
    let center = min + size / 2.0;
    let silhouette = project_silhouette(mesh, rotation, projection);
    Some(silhouette.map_points(|p| Point2::new((p.x - center.x) / size.x, (p.y - center.y) / size.y)))
}
